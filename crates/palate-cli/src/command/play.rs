use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::bail;
use chrono::Utc;
use palate_engine::{GameError, RoundEngine, Session, SessionSeed, Winner};
use palate_model::{CatalogItem, ItemId};

use crate::{command::GameArgs, util::Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    #[clap(flatten)]
    game: GameArgs,
    /// Your name on the scoreboard
    #[arg(long, default_value = "player")]
    player: String,
    /// Save the finished session to a JSON file
    #[arg(long)]
    save: Option<PathBuf>,
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let PlayArg { game, player, save } = arg;

    let engine = game.engine()?;
    let mut console = Console {
        input: io::stdin().lock(),
        output: io::stdout().lock(),
    };
    let session = play(&engine, &mut console, player, game.seed())?;
    if let Some(path) = save {
        Output::save_json(&session, Some(path.clone()))?;
    }
    Ok(())
}

struct Console<R, W> {
    input: R,
    output: W,
}

impl<R, W> Console<R, W>
where
    R: BufRead,
    W: Write,
{
    fn ask(&mut self, prompt: &str) -> anyhow::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed");
        }
        Ok(line.trim().to_owned())
    }

    fn ask_rating(&mut self, prompt: &str, optional: bool) -> anyhow::Result<Option<u8>> {
        loop {
            let line = self.ask(prompt)?;
            if optional && line.is_empty() {
                return Ok(None);
            }
            match line.parse::<u8>() {
                Ok(rating @ 1..=5) => return Ok(Some(rating)),
                _ => writeln!(self.output, "Please enter a number from 1 to 5.")?,
            }
        }
    }

    fn list(&mut self, engine: &RoundEngine, ids: &[ItemId]) -> anyhow::Result<()> {
        for (n, id) in ids.iter().enumerate() {
            match engine.catalog().get(id) {
                Some(item) => writeln!(self.output, "{:>3}. {}", n + 1, describe(item))?,
                None => writeln!(self.output, "{:>3}. {id}", n + 1)?,
            }
        }
        Ok(())
    }
}

fn describe(item: &CatalogItem) -> String {
    let title = if item.title.is_empty() {
        item.id.as_str()
    } else {
        item.title.as_str()
    };
    let mut text = format!("{title} ({})", item.vendor_or_unknown());
    if let Some(price) = item.price_min {
        text.push_str(&format!(" ${price:.2}"));
    }
    if !item.tags.is_empty() {
        text.push_str(&format!(" [{}]", item.tags.join(", ")));
    }
    text
}

/// Parses 1-based item numbers separated by spaces or commas.
fn parse_indices(line: &str, len: usize) -> Result<Vec<usize>, String> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| match token.parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => Ok(n - 1),
            _ => Err(format!("`{token}` is not a number between 1 and {len}")),
        })
        .collect()
}

/// Parses a single 1-based pick; a trailing `!` flags an exception.
fn parse_pick(line: &str, len: usize) -> Option<(usize, bool)> {
    let (number, exception) = match line.strip_suffix('!') {
        Some(number) => (number.trim(), true),
        None => (line, false),
    };
    match parse_indices(number, len).ok()?.as_slice() {
        &[index] => Some((index, exception)),
        _ => None,
    }
}

fn play<R, W>(
    engine: &RoundEngine,
    console: &mut Console<R, W>,
    player: &str,
    seed: SessionSeed,
) -> anyhow::Result<Session>
where
    R: BufRead,
    W: Write,
{
    let profile = &engine.config().profile;
    let copy = profile.copy();
    let session_id = format!("play-{}", Utc::now().format("%Y%m%d%H%M%S"));
    let mut session = engine.start(session_id, player, seed)?;

    writeln!(console.output, "{} - {}", copy.display_name, copy.onboarding_action)?;
    let pool = session.onboarding_pool().to_vec();
    console.list(engine, &pool)?;
    loop {
        let line = console.ask(&format!(
            "Pick {} {} by number: ",
            profile.onboarding_picks, copy.item_plural
        ))?;
        let picks = match parse_indices(&line, pool.len()) {
            Ok(indices) => indices.into_iter().map(|i| pool[i].clone()).collect::<Vec<_>>(),
            Err(message) => {
                writeln!(console.output, "{message}")?;
                continue;
            }
        };
        let Some(rating) = console.ask_rating("How much do you like this set (1-5)? ", false)?
        else {
            continue;
        };
        match engine.submit_onboarding(&mut session, &picks, rating) {
            Ok(()) => break,
            Err(err @ GameError::InvalidSelectionCount { .. }) => writeln!(console.output, "{err}")?,
            Err(err) => return Err(err.into()),
        }
    }

    while !session.status().is_complete() {
        let round = engine.start_round(&mut session)?;
        writeln!(
            console.output,
            "\nRound {}/{} (coherence {:.2}, predicted rating {:.1})",
            round.round_number,
            session.total_rounds(),
            round.pre_metrics.coherence,
            round.pre_metrics.predicted_rating
        )?;
        console.list(engine, &round.candidates)?;

        let outcome = loop {
            let line = console.ask(&format!(
                "Your {} (append ! if it is not your usual taste): ",
                copy.item_singular
            ))?;
            let Some((index, exception)) = parse_pick(&line, round.candidates.len()) else {
                writeln!(console.output, "Enter one number from the list.")?;
                continue;
            };
            let pick = &round.candidates[index];
            let result = if exception {
                engine.submit_exception_pick(&mut session, round.round_number, pick)
            } else {
                engine.submit_pick(&mut session, round.round_number, pick)
            };
            break result?;
        };

        let record = &outcome.record;
        let agent_pick = engine
            .catalog()
            .get(&record.agent_pick)
            .map_or_else(|| record.agent_pick.to_string(), describe);
        writeln!(console.output, "The agent predicted: {agent_pick}")?;
        if record.ai_correct {
            writeln!(console.output, "The agent read you right. Agent +{}", record.agent_points)?;
        } else if record.near_miss {
            writeln!(
                console.output,
                "Close call, it was the agent's runner-up. You +{}",
                record.human_points
            )?;
        } else {
            writeln!(console.output, "You surprised the agent. You +{}", record.human_points)?;
        }
        writeln!(
            console.output,
            "Score: you {} - agent {}",
            outcome.human_score, outcome.agent_score
        )?;

        if outcome.game_complete {
            continue;
        }
        if let Some(rating) =
            console.ask_rating("Rate your picks so far (1-5, enter to skip): ", true)?
        {
            engine.rate_prefix(&mut session, rating, Vec::new())?;
        }
    }

    let summary = engine.summarize(&session)?;
    let verdict = match summary.winner {
        Winner::Human => "You win!",
        Winner::Agent => "The agent wins.",
        Winner::Draw => "It's a draw.",
    };
    writeln!(
        console.output,
        "\nFinal score: you {} - agent {}. {verdict}",
        summary.human_score, summary.agent_score
    )?;

    writeln!(console.output, "\n{}", copy.top_recommendations_label)?;
    let recommended = summary
        .recommendations
        .iter()
        .map(|r| r.item_id.clone())
        .collect::<Vec<_>>();
    console.list(engine, &recommended)?;

    if !summary.hidden.is_empty() {
        writeln!(console.output, "\n{}", copy.hidden_gems_label)?;
        let labels = summary
            .hidden
            .qualifying
            .iter()
            .filter_map(|f| copy.feature_label(&f.key))
            .collect::<Vec<_>>();
        writeln!(console.output, "You lean toward: {}", labels.join(", "))?;
        writeln!(console.output, "{}", copy.hidden_gems_subtitle)?;
        let gems = summary
            .hidden
            .gems
            .iter()
            .map(|g| g.item_id.clone())
            .collect::<Vec<_>>();
        console.list(engine, &gems)?;
    }
    Ok(session)
}
