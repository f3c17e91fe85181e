use std::path::PathBuf;

use anyhow::Context as _;
use palate_engine::{FinalScores, GameSummary, RoundEngine, Session, SessionSeed};
use palate_model::{FeatureKey, FeatureVector, ItemId};
use rand::{Rng, SeedableRng as _, seq::IndexedRandom as _};
use rand_distr::{Distribution as _, Normal};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::{command::GameArgs, util::Output};

/// Mixed into the session seed so the player's dice differ from the engine's.
const PLAYER_SALT: u64 = 0x5eed_0f_a11a_7e;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    #[clap(flatten)]
    game: GameArgs,
    /// Name recorded for the simulated player
    #[arg(long, default_value = "simulated")]
    player: String,
    /// Number of features the simulated player secretly favors
    #[arg(long, default_value_t = 3)]
    taste_size: usize,
    /// Standard deviation of the noise added to each judgment
    #[arg(long, default_value_t = 0.3)]
    noise: f32,
    /// Rate the picks so far after every N rounds (0 disables)
    #[arg(long, default_value_t = 3)]
    rate_every: usize,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    seed: SessionSeed,
    taste: Vec<FeatureKey>,
    scores: FinalScores,
    summary: GameSummary,
}

/// A player who likes a fixed set of features and judges items with noise.
struct ScriptedPlayer {
    taste: FeatureVector,
    noise: Normal<f32>,
    rng: Pcg32,
}

impl ScriptedPlayer {
    /// Utility without noise: number of favored features the item carries.
    fn affinity(&self, item: &FeatureVector) -> f32 {
        self.taste.dot(item)
    }

    fn judge(&mut self, item: &FeatureVector) -> f32 {
        self.affinity(item) + self.noise.sample(&mut self.rng)
    }

    /// Indices of the `n` items judged best this time.
    fn favorites(&mut self, items: &[&FeatureVector], n: usize) -> Vec<usize> {
        let mut judged = items
            .iter()
            .enumerate()
            .map(|(i, item)| (self.judge(item), i))
            .collect::<Vec<_>>();
        judged.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        judged.into_iter().take(n).map(|(_, i)| i).collect()
    }

    /// Rating from the mean affinity of `picks`, on the 1 to 5 scale.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn rate(&mut self, picks: &[&FeatureVector], taste_size: usize) -> u8 {
        if picks.is_empty() || taste_size == 0 {
            return 3;
        }
        let mean = picks.iter().map(|p| self.affinity(p)).sum::<f32>() / picks.len() as f32;
        let share = (mean / taste_size as f32).clamp(0.0, 1.0);
        let noisy = 1.0 + 4.0 * share + self.noise.sample(&mut self.rng);
        noisy.round().clamp(1.0, 5.0) as u8
    }

    /// Rates everything the session has selected so far.
    fn rate_selections(
        &mut self,
        engine: &RoundEngine,
        session: &Session,
        taste_size: usize,
    ) -> anyhow::Result<u8> {
        let picked = session
            .selections()
            .iter()
            .map(|s| s.item_id.clone())
            .collect::<Vec<_>>();
        Ok(self.rate(&vectors_of(engine, &picked)?, taste_size))
    }
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let SimulateArg {
        game,
        player,
        taste_size,
        noise,
        rate_every,
        output,
    } = arg;

    let engine = game.engine()?;
    let seed = game.seed();
    #[expect(clippy::cast_possible_truncation)]
    let mut rng = Pcg32::seed_from_u64(seed.as_u128() as u64 ^ PLAYER_SALT);
    let taste = pick_taste(&engine, *taste_size, &mut rng);
    let mut scripted = ScriptedPlayer {
        taste: engine.catalog().space().indicator(&taste),
        noise: Normal::new(0.0, *noise).context("Invalid --noise")?,
        rng,
    };
    tracing::info!(
        taste = ?taste.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "simulated player ready"
    );

    let session_id = format!("sim-{seed}");
    let mut session = engine.start(session_id, player.as_str(), seed)?;

    let pool = session.onboarding_pool().to_vec();
    let vectors = vectors_of(&engine, &pool)?;
    let picks = scripted
        .favorites(&vectors, engine.config().profile.onboarding_picks)
        .into_iter()
        .map(|i| pool[i].clone())
        .collect::<Vec<_>>();
    let picked_vectors = vectors_of(&engine, &picks)?;
    let rating = scripted.rate(&picked_vectors, *taste_size);
    engine.submit_onboarding(&mut session, &picks, rating)?;

    while !session.status().is_complete() {
        let round = engine.start_round(&mut session)?;
        let vectors = vectors_of(&engine, &round.candidates)?;
        let choice = scripted.favorites(&vectors, 1)[0];
        let pick = &round.candidates[choice];
        let outcome = if scripted.affinity(vectors[choice]) > 0.0 {
            engine.submit_pick(&mut session, round.round_number, pick)?
        } else {
            // Nothing the player likes: flag the pick as off-taste.
            engine.submit_exception_pick(&mut session, round.round_number, pick)?
        };

        if *rate_every > 0 && round.round_number % rate_every == 0 && !outcome.game_complete {
            let rating = scripted.rate_selections(&engine, &session, *taste_size)?;
            engine.rate_prefix(&mut session, rating, Vec::new())?;
        }
    }

    let report = SimulationReport {
        seed,
        taste,
        scores: session.final_scores(),
        summary: engine.summarize(&session)?,
    };
    eprintln!(
        "human {} - agent {} ({:?})",
        report.scores.human_score, report.scores.agent_score, report.summary.winner
    );
    Output::save_json(&report, output.clone())?;
    Ok(())
}

fn pick_taste<R>(engine: &RoundEngine, size: usize, rng: &mut R) -> Vec<FeatureKey>
where
    R: Rng + ?Sized,
{
    let space = engine.catalog().space();
    let categorical = space.categorical_indices().collect::<Vec<_>>();
    categorical
        .choose_multiple(rng, size)
        .map(|&i| space.key(i).clone())
        .collect()
}

fn vectors_of<'a>(engine: &'a RoundEngine, ids: &[ItemId]) -> anyhow::Result<Vec<&'a FeatureVector>> {
    ids.iter()
        .map(|id| {
            engine
                .catalog()
                .vector(id)
                .with_context(|| format!("Item {id} missing from the catalog"))
        })
        .collect()
}
