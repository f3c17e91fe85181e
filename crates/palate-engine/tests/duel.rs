use std::{collections::HashSet, sync::Arc};

use palate_engine::{
    Catalog, GameConfig, GameError, RoundEngine, SelectionSource, Session, SessionSeed,
    SessionStatus, Winner,
};
use palate_model::{CatalogItem, Category, FeatureKey, ItemId};

const VENDORS: [&str; 6] = ["Lamy", "Pilot", "Sailor", "TWSBI", "Kaweco", "Platinum"];
const TAGS: [&str; 5] = ["demonstrator", "piston", "vintage", "gold nib", "pocket"];

#[expect(clippy::cast_precision_loss)]
fn catalog(n: usize) -> Arc<Catalog> {
    let items = (0..n)
        .map(|i| {
            let price = 15.0 + (i * 37 % 200) as f32;
            CatalogItem::new(format!("pen-{i:03}"), Category::FountainPens)
                .with_title(format!("Pen {i}"))
                .with_vendor(VENDORS[i % VENDORS.len()])
                .with_item_type("Fountain Pens")
                .with_tags([TAGS[i % TAGS.len()], TAGS[(i / 5) % TAGS.len()]])
                .with_option("Nib Size", [["EF", "F", "M", "B"][i % 4]])
                .with_price(price, price * 1.2)
        })
        .collect();
    Arc::new(Catalog::new(items))
}

fn engine(items: usize, rounds: usize) -> RoundEngine {
    let mut config = GameConfig::for_category(Category::FountainPens);
    config.profile.total_rounds = rounds;
    RoundEngine::new(catalog(items), config).unwrap()
}

fn onboarded(engine: &RoundEngine, seed: u128) -> Session {
    let mut session = engine
        .start("duel", "Ada", SessionSeed::from_u128(seed))
        .unwrap();
    let picks = session.onboarding_pool()[..10].to_vec();
    engine.submit_onboarding(&mut session, &picks, 4).unwrap();
    session
}

#[test]
fn test_sixty_item_scenario() {
    let engine = engine(60, 10);
    let mut session = engine
        .start("scenario", "Ada", SessionSeed::from_u128(1))
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Onboarding);
    assert_eq!(session.onboarding_pool().len(), 50);
    assert_eq!(engine.onboarding_items(&session).len(), 50);

    let picks = session.onboarding_pool()[..10].to_vec();
    engine.submit_onboarding(&mut session, &picks, 4).unwrap();
    assert_eq!(session.status(), SessionStatus::Playing);
    assert_eq!(session.round_index(), 0);
    assert_eq!(session.model().state().selection_count(), 10);
    assert_eq!(session.prefix_ratings().len(), 1);

    let round = engine.start_round(&mut session).unwrap();
    assert_eq!(round.round_number, 1);
    assert_eq!(round.candidates.len(), 10);
    assert!(round.candidates.iter().all(|id| !picks.contains(id)));
    assert_eq!(round.candidates.iter().collect::<HashSet<_>>().len(), 10);

    let outcome = engine
        .submit_pick(&mut session, 1, &round.candidates[0])
        .unwrap();
    let record = &outcome.record;
    assert_eq!(record.ai_correct, record.agent_pick == round.candidates[0]);
    if record.ai_correct {
        assert_eq!((session.agent_score(), session.human_score()), (10, 0));
    } else {
        assert_eq!((session.agent_score(), session.human_score()), (0, 10));
    }
    assert_eq!(record.human_points + record.agent_points, 10);
    assert_eq!(session.model().state().selection_count(), 11);
    assert_eq!(session.round_index(), 1);
    assert!(!outcome.game_complete);
}

#[test]
fn test_matching_agent_pick_scores_for_agent() {
    let engine = engine(80, 3);
    let mut session = onboarded(&engine, 2);
    let round = engine.start_round(&mut session).unwrap();
    let agent_pick = session.open_round().unwrap().agent_pick.clone();
    assert!(round.candidates.contains(&agent_pick));

    let outcome = engine
        .submit_pick(&mut session, round.round_number, &agent_pick)
        .unwrap();
    assert!(outcome.record.ai_correct);
    assert!(!outcome.record.near_miss);
    assert_eq!((outcome.agent_score, outcome.human_score), (10, 0));

    // The runner-up is a near miss and scores for the human.
    let round = engine.start_round(&mut session).unwrap();
    let runner_up = session.open_round().unwrap().agent_top[1].clone();
    let outcome = engine
        .submit_pick(&mut session, round.round_number, &runner_up)
        .unwrap();
    assert!(!outcome.record.ai_correct);
    assert!(outcome.record.near_miss);
    assert_eq!((outcome.agent_score, outcome.human_score), (10, 10));
}

#[test]
fn test_agent_pick_is_top_scored_candidate() {
    let engine = engine(80, 2);
    let mut session = onboarded(&engine, 3);
    engine.start_round(&mut session).unwrap();
    let open = session.open_round().unwrap();
    let best = open
        .candidates
        .iter()
        .max_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| b.item_id.cmp(&a.item_id))
        })
        .unwrap();
    assert_eq!(open.agent_pick, best.item_id);
    assert_eq!(open.agent_top.len(), 3);
    assert_eq!(open.presentation.len(), open.candidates.len());
}

#[test]
fn test_onboarding_rejections_leave_session_untouched() {
    let engine = engine(60, 5);
    let mut session = engine
        .start("reject", "Ada", SessionSeed::from_u128(4))
        .unwrap();
    let before = session.clone();
    let pool = session.onboarding_pool().to_vec();

    let err = engine
        .submit_onboarding(&mut session, &pool[..9], 4)
        .unwrap_err();
    assert_eq!(
        err,
        GameError::InvalidSelectionCount {
            expected: 10,
            valid: 9,
            submitted: 9
        }
    );

    let mut duplicated = pool[..9].to_vec();
    duplicated.push(pool[0].clone());
    let err = engine
        .submit_onboarding(&mut session, &duplicated, 4)
        .unwrap_err();
    assert!(matches!(
        err,
        GameError::InvalidSelectionCount { valid: 9, submitted: 10, .. }
    ));

    let outsider = engine
        .catalog()
        .items()
        .iter()
        .map(|item| item.id.clone())
        .find(|id| !pool.contains(id))
        .unwrap();
    let mut foreign = pool[..9].to_vec();
    foreign.push(outsider);
    assert!(matches!(
        engine.submit_onboarding(&mut session, &foreign, 4),
        Err(GameError::InvalidSelectionCount { valid: 9, .. })
    ));

    assert_eq!(
        engine.submit_onboarding(&mut session, &pool[..10], 0),
        Err(GameError::InvalidRating { rating: 0 })
    );
    assert_eq!(session, before);

    engine
        .submit_onboarding(&mut session, &pool[..10], 5)
        .unwrap();
    assert!(matches!(
        engine.submit_onboarding(&mut session, &pool[..10], 5),
        Err(GameError::RoundSequence {
            status: SessionStatus::Playing,
            ..
        })
    ));
}

#[test]
fn test_round_sequence_errors() {
    let engine = engine(80, 2);
    let mut fresh = engine
        .start("seq", "Ada", SessionSeed::from_u128(5))
        .unwrap();
    assert!(matches!(
        engine.start_round(&mut fresh),
        Err(GameError::RoundSequence {
            status: SessionStatus::Onboarding,
            ..
        })
    ));

    let mut session = onboarded(&engine, 5);
    assert!(matches!(
        engine.submit_pick(&mut session, 1, &ItemId::from("pen-000")),
        Err(GameError::RoundSequence { .. })
    ));

    let round = engine.start_round(&mut session).unwrap();
    let before = session.clone();
    let err = engine.start_round(&mut session).unwrap_err();
    assert!(err.is_round_sequence());
    assert_eq!(session, before);

    assert!(matches!(
        engine.rate_prefix(&mut session, 3, Vec::new()),
        Err(GameError::RoundSequence { .. })
    ));
    assert!(matches!(
        engine.summarize(&session),
        Err(GameError::RoundSequence { .. })
    ));
    engine
        .submit_pick(&mut session, round.round_number, &round.candidates[2])
        .unwrap();
}

#[test]
fn test_stale_and_foreign_picks_do_not_mutate() {
    let engine = engine(80, 3);
    let mut session = onboarded(&engine, 6);
    let first = engine.start_round(&mut session).unwrap();
    engine
        .submit_pick(&mut session, 1, &first.candidates[0])
        .unwrap();

    // Resubmitting the resolved round before the next one starts.
    let before = session.clone();
    assert_eq!(
        engine.submit_pick(&mut session, 1, &first.candidates[1]),
        Err(GameError::StaleRound {
            submitted: 1,
            current: 2
        })
    );
    assert_eq!(session, before);

    let second = engine.start_round(&mut session).unwrap();
    let before = session.clone();
    assert_eq!(
        engine.submit_pick(&mut session, 1, &second.candidates[0]),
        Err(GameError::StaleRound {
            submitted: 1,
            current: 2
        })
    );
    assert_eq!(
        engine.submit_pick(&mut session, 2, &first.candidates[0]),
        Err(GameError::InvalidCandidate {
            round_number: 2,
            item_id: first.candidates[0].clone()
        })
    );
    assert_eq!(session, before);
}

#[test]
fn test_candidates_skip_picks_and_previous_round() {
    let engine = engine(150, 10);
    let mut session = onboarded(&engine, 7);
    let mut previous = HashSet::new();
    while !session.status().is_complete() {
        let picked = session
            .selections()
            .iter()
            .map(|s| s.item_id.clone())
            .collect::<HashSet<_>>();
        let round = engine.start_round(&mut session).unwrap();
        let offered = round.candidates.iter().cloned().collect::<HashSet<_>>();
        assert_eq!(offered.len(), 10);
        assert!(offered.is_disjoint(&picked), "a selected item was offered again");
        assert!(offered.is_disjoint(&previous), "previous round repeated");
        engine
            .submit_pick(&mut session, round.round_number, &round.candidates[9])
            .unwrap();
        previous = offered;
    }
}

#[test]
fn test_default_profile_plays_out_on_sixty_items() {
    let engine = RoundEngine::new(catalog(60), GameConfig::for_category(Category::FountainPens))
        .unwrap();
    let mut session = onboarded(&engine, 21);
    for number in 1..=10 {
        let round = engine.start_round(&mut session).unwrap();
        assert_eq!(round.round_number, number);
        assert_eq!(round.candidates.len(), 10);
        engine
            .submit_pick(&mut session, number, &round.candidates[0])
            .unwrap();
    }
    assert_eq!(session.status(), SessionStatus::Complete);
    let summary = engine.summarize(&session).unwrap();
    assert_eq!(summary.rounds.len(), 10);
    assert_eq!(summary.human_score + summary.agent_score, 100);
}

#[test]
fn test_tight_catalog_reuses_earlier_candidates() {
    let mut config = GameConfig::for_category(Category::FountainPens);
    config.profile.pool_size = 10;
    config.profile.total_rounds = 3;
    // Ten picks plus two rounds leave exactly one full round after round 1.
    let engine = RoundEngine::new(catalog(22), config).unwrap();
    let mut session = onboarded(&engine, 22);
    let mut shown = Vec::new();
    while !session.status().is_complete() {
        let round = engine.start_round(&mut session).unwrap();
        let picked = session
            .selections()
            .iter()
            .map(|s| &s.item_id)
            .collect::<HashSet<_>>();
        assert_eq!(round.candidates.len(), 10);
        assert!(round.candidates.iter().all(|id| !picked.contains(id)));
        engine
            .submit_pick(&mut session, round.round_number, &round.candidates[0])
            .unwrap();
        shown.push(round.candidates);
    }
    assert_eq!(shown.len(), 3);
    assert!(shown[1].iter().any(|id| shown[0].contains(id)));
}

#[test]
fn test_same_seed_same_game() {
    let engine = engine(120, 4);
    let play = |seed| {
        let mut session = onboarded(&engine, seed);
        let mut rounds = Vec::new();
        for _ in 0..4 {
            let round = engine.start_round(&mut session).unwrap();
            engine
                .submit_pick(&mut session, round.round_number, &round.candidates[0])
                .unwrap();
            rounds.push(round.candidates);
        }
        (session.onboarding_pool().to_vec(), rounds, session.human_score())
    };
    assert_eq!(play(11), play(11));
    assert_ne!(play(11).0, play(12).0);
}

#[test]
fn test_hidden_preferences_wait_for_enough_selections() {
    let engine = engine(80, 3);
    let mut session = onboarded(&engine, 8);
    let round = engine.start_round(&mut session).unwrap();
    engine
        .submit_pick(&mut session, round.round_number, &round.candidates[0])
        .unwrap();

    // 10 onboarding picks plus one round: one short of the threshold.
    assert_eq!(
        session.selections().len(),
        engine.config().profile.hidden.min_selections - 1
    );
    let hidden = engine.hidden_preferences(&session);
    assert!(hidden.is_empty());
    assert!(hidden.features.is_empty());

    let round = engine.start_round(&mut session).unwrap();
    engine
        .submit_pick(&mut session, round.round_number, &round.candidates[0])
        .unwrap();
    let hidden = engine.hidden_preferences(&session);
    assert!(!hidden.features.is_empty());
    assert!(hidden.features.iter().all(|f| !f.key.is_numeric()));
}

#[test]
fn test_exception_pick_moves_model_less() {
    let engine = engine(80, 2);
    let mut normal = onboarded(&engine, 9);
    let mut exception = normal.clone();

    let round = engine.start_round(&mut normal).unwrap();
    engine.start_round(&mut exception).unwrap();
    let pick = &round.candidates[5];
    engine.submit_pick(&mut normal, 1, pick).unwrap();
    let outcome = engine.submit_exception_pick(&mut exception, 1, pick).unwrap();

    assert!(outcome.record.is_exception);
    let last = exception.selections().last().unwrap();
    assert!(last.is_exception);
    assert_eq!(last.source, SelectionSource::Round(1));

    let target = engine.catalog().vector(pick).unwrap();
    let normal_score = normal.model().score(target);
    let exception_score = exception.model().score(target);
    assert!(normal_score > exception_score);
    assert_eq!(normal.model().state().selection_count(), 11);
    assert_eq!(exception.model().state().selection_count(), 11);
}

#[test]
fn test_prefix_rating_between_rounds() {
    let engine = engine(80, 3);
    let mut session = onboarded(&engine, 10);
    let bias = session.model().state().bias();
    let predicted = session.model().predict_prefix_rating();

    let after = engine
        .rate_prefix(&mut session, 1, vec!["too flashy".to_owned()])
        .unwrap();
    assert!(session.model().state().bias() < bias);
    assert!(after < predicted);
    assert_eq!(session.prefix_ratings().len(), 2);
    assert_eq!(session.prefix_ratings()[1].tags, ["too flashy"]);

    assert_eq!(
        engine.rate_prefix(&mut session, 6, Vec::new()),
        Err(GameError::InvalidRating { rating: 6 })
    );
}

#[test]
fn test_full_game_summary() {
    let engine = engine(150, 10);
    let mut session = onboarded(&engine, 12);
    let mut last = None;
    for expected in 1..=10 {
        let status = engine.status(&session);
        assert_eq!(status.round_index, expected - 1);
        let round = engine.start_round(&mut session).unwrap();
        assert_eq!(round.round_number, expected);
        assert_eq!(engine.status(&session).open_round, Some(expected));
        last = Some(
            engine
                .submit_pick(&mut session, round.round_number, &round.candidates[3])
                .unwrap(),
        );
    }
    assert!(last.unwrap().game_complete);
    assert_eq!(session.status(), SessionStatus::Complete);
    assert!(engine.start_round(&mut session).unwrap_err().is_round_sequence());

    let summary = engine.summarize(&session).unwrap();
    assert_eq!(summary.rounds.len(), 10);
    assert_eq!(summary.human_score + summary.agent_score, 100);
    let expected_winner = match summary.human_score.cmp(&summary.agent_score) {
        std::cmp::Ordering::Greater => Winner::Human,
        std::cmp::Ordering::Less => Winner::Agent,
        std::cmp::Ordering::Equal => Winner::Draw,
    };
    assert_eq!(summary.winner, expected_winner);
    // Every pen is a fountain pen: too generic to list as a taste.
    assert_eq!(summary.top_features.len(), 5);
    assert!(
        summary
            .top_features
            .iter()
            .all(|f| f.key != FeatureKey::item_type("Fountain Pens"))
    );
    let labels = summary
        .top_features
        .iter()
        .map(|f| f.label.as_str())
        .collect::<HashSet<_>>();
    assert_eq!(labels.len(), 5);
    assert!(summary.recommendations.len() <= 5);
    assert!(!summary.recommendations.is_empty());
    let seen = session.seen_items();
    assert!(
        summary
            .recommendations
            .iter()
            .all(|r| !seen.contains(&r.item_id))
    );
    assert!(summary.hidden.gems.iter().all(|g| !seen.contains(&g.item_id)));

    let scores = session.final_scores();
    assert!(scores.complete);
    assert_eq!(scores.rounds_played, 10);

    let json = serde_json::to_string(&session).unwrap();
    let restored: Session = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, session);
}

#[test]
fn test_small_catalog_is_rejected() {
    let engine = engine(40, 5);
    let err = engine
        .start("small", "Ada", SessionSeed::from_u128(0))
        .unwrap_err();
    assert!(matches!(
        err,
        GameError::InsufficientCatalog(ref e) if e.required == 50 && e.available == 40
    ));

    // Enough for the pool, but the tenth round would run dry.
    let mut config = GameConfig::for_category(Category::FountainPens);
    config.profile.pool_size = 10;
    let engine = RoundEngine::new(catalog(28), config).unwrap();
    let err = engine
        .start("small", "Ada", SessionSeed::from_u128(0))
        .unwrap_err();
    assert!(matches!(
        err,
        GameError::InsufficientCatalog(ref e) if e.required == 29 && e.available == 28
    ));
}

#[test]
fn test_any_other_round_number_is_stale() {
    let engine = engine(80, 3);
    let mut session = onboarded(&engine, 13);
    let before = session.clone();
    assert_eq!(
        engine.submit_pick(&mut session, 3, &ItemId::from("pen-000")),
        Err(GameError::StaleRound {
            submitted: 3,
            current: 1
        })
    );
    assert_eq!(
        engine.submit_pick(&mut session, 0, &ItemId::from("pen-000")),
        Err(GameError::StaleRound {
            submitted: 0,
            current: 1
        })
    );
    assert_eq!(session, before);

    let round = engine.start_round(&mut session).unwrap();
    assert_eq!(
        engine.submit_pick(&mut session, 2, &round.candidates[0]),
        Err(GameError::StaleRound {
            submitted: 2,
            current: 1
        })
    );
}
