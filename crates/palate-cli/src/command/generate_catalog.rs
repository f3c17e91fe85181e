use std::path::PathBuf;

use chrono::Utc;
use palate_model::{CatalogItem, Category};
use rand::{Rng, SeedableRng as _, seq::IndexedRandom as _};
use rand_distr::{Distribution as _, Normal};
use rand_pcg::Pcg32;

use crate::util::{CatalogFile, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateCatalogArg {
    /// Category of the generated items
    #[arg(long, default_value_t = Category::FountainPens)]
    category: Category,
    /// Number of items to generate
    #[arg(long, default_value_t = 200)]
    items: usize,
    /// Generator seed; random when omitted
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Vocabulary of one category. Vendors carry a typical price.
struct Vocabulary {
    prefix: &'static str,
    vendors: &'static [(&'static str, f32)],
    item_types: &'static [&'static str],
    tags: &'static [&'static str],
    options: &'static [(&'static str, &'static [&'static str])],
    titles: &'static [&'static str],
}

const FOUNTAIN_PENS: Vocabulary = Vocabulary {
    prefix: "pen",
    vendors: &[
        ("Lamy", 35.0),
        ("Pilot", 60.0),
        ("Sailor", 180.0),
        ("TWSBI", 50.0),
        ("Kaweco", 30.0),
        ("Platinum", 90.0),
        ("Pelikan", 220.0),
        ("Esterbrook", 170.0),
        ("Diplomat", 120.0),
        ("Montblanc", 650.0),
    ],
    item_types: &["Fountain Pens"],
    tags: &[
        "demonstrator",
        "piston filler",
        "cartridge converter",
        "vintage",
        "gold nib",
        "steel nib",
        "pocket",
        "resin",
        "metal body",
        "eyedropper",
        "limited edition",
        "flex nib",
    ],
    options: &[
        ("Nib Size", &["EF", "F", "M", "B", "Stub"]),
        ("Color", &["Black", "Blue", "Clear", "Red", "Green", "Orange"]),
    ],
    titles: &["Classic", "Vac", "Eco", "Sport", "Pro", "Heritage", "Studio", "Nova"],
};

const MOVIES: Vocabulary = Vocabulary {
    prefix: "movie",
    vendors: &[
        ("A24", 4.0),
        ("Neon", 4.0),
        ("Warner Bros.", 5.0),
        ("Universal", 5.0),
        ("Studio Ghibli", 4.5),
        ("Focus Features", 4.0),
        ("Searchlight", 4.0),
        ("Paramount", 5.0),
    ],
    item_types: &["Feature Film", "Documentary", "Animation"],
    tags: &[
        "drama",
        "thriller",
        "comedy",
        "horror",
        "science fiction",
        "romance",
        "noir",
        "heist",
        "christopher nolan",
        "greta gerwig",
        "denis villeneuve",
        "bong joon-ho",
    ],
    options: &[
        ("Decade", &["1980s", "1990s", "2000s", "2010s", "2020s"]),
        ("Certification", &["PG", "PG-13", "R"]),
    ],
    titles: &["Night", "Harbor", "Signal", "Echo", "Orchard", "Frontier", "Glass", "Tide"],
};

impl Vocabulary {
    fn of(category: Category) -> &'static Self {
        match category {
            Category::FountainPens => &FOUNTAIN_PENS,
            Category::Movies => &MOVIES,
        }
    }
}

pub(crate) fn run(arg: &GenerateCatalogArg) -> anyhow::Result<()> {
    let GenerateCatalogArg {
        category,
        items,
        seed,
        output,
    } = arg;

    let seed = seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = Pcg32::seed_from_u64(seed);
    let items = generate(*category, *items, &mut rng)?;
    tracing::info!(%category, items = items.len(), seed, "catalog generated");

    let file = CatalogFile {
        generated_at: Some(Utc::now()),
        items,
    };
    Output::save_json(&file, output.clone())?;
    Ok(())
}

fn generate<R>(category: Category, count: usize, rng: &mut R) -> anyhow::Result<Vec<CatalogItem>>
where
    R: Rng + ?Sized,
{
    let vocabulary = Vocabulary::of(category);
    // Spread of log-prices around the vendor's typical price.
    let price_noise = Normal::new(0.0_f32, 0.35)?;

    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let &(vendor, typical_price) = vocabulary
            .vendors
            .choose(rng)
            .ok_or_else(|| anyhow::anyhow!("empty vendor list"))?;
        let title = vocabulary.titles.choose(rng).copied().unwrap_or("Item");
        let item_type = vocabulary.item_types.choose(rng).copied().unwrap_or_default();
        let tag_count = rng.random_range(1..=3);
        let tags = vocabulary
            .tags
            .choose_multiple(rng, tag_count)
            .copied()
            .collect::<Vec<_>>();

        let price_min = (typical_price * price_noise.sample(rng).exp() * 100.0).round() / 100.0;
        let price_max = (price_min * rng.random_range(1.0..1.3) * 100.0).round() / 100.0;

        let mut item = CatalogItem::new(format!("{}-{i:05}", vocabulary.prefix), category)
            .with_title(format!("{vendor} {title} {}", i + 1))
            .with_vendor(vendor)
            .with_item_type(item_type)
            .with_tags(tags)
            .with_price(price_min, price_max);
        for &(name, values) in vocabulary.options {
            let offered = rng.random_range(1..=2);
            item = item.with_option(name, values.choose_multiple(rng, offered).copied());
        }
        items.push(item);
    }
    Ok(items)
}
