use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use palate_engine::{CatalogProvider, GameConfig};
use palate_model::{CatalogItem, Category};
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Game configuration overriding the built-in category profile.
pub fn read_config_file<P>(path: P) -> anyhow::Result<GameConfig>
where
    P: AsRef<Path>,
{
    read_json_file("game config", path)
}

/// On-disk catalog, as written by `generate-catalog`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    pub items: Vec<CatalogItem>,
}

/// A plain item array is accepted as well as a [`CatalogFile`].
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    File(CatalogFile),
    Items(Vec<CatalogItem>),
}

/// Catalog provider backed by a JSON file. The file is re-read on every
/// snapshot.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogProvider for JsonCatalog {
    type Error = anyhow::Error;

    fn snapshot(&self, category: Category) -> anyhow::Result<Vec<CatalogItem>> {
        let items = match read_json_file("catalog", &self.path)? {
            CatalogDocument::File(file) => file.items,
            CatalogDocument::Items(items) => items,
        };
        Ok(items
            .into_iter()
            .filter(|item| item.category == category)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_json_catalog_accepts_both_layouts() {
        let dir = std::env::temp_dir().join(format!("palate-cli-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let items = vec![
            CatalogItem::new("p1", Category::FountainPens).with_vendor("Lamy"),
            CatalogItem::new("m1", Category::Movies),
        ];

        let bare = dir.join("bare.json");
        fs::write(&bare, serde_json::to_string(&items).unwrap()).unwrap();
        let wrapped = dir.join("wrapped.json");
        let file = CatalogFile {
            generated_at: Some(Utc::now()),
            items,
        };
        fs::write(&wrapped, serde_json::to_string(&file).unwrap()).unwrap();

        for path in [bare, wrapped] {
            let pens = JsonCatalog::new(&path)
                .snapshot(Category::FountainPens)
                .unwrap();
            assert_eq!(pens.len(), 1);
            assert_eq!(pens[0].vendor.as_deref(), Some("Lamy"));
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = JsonCatalog::new("/nonexistent/catalog.json")
            .snapshot(Category::Movies)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to open catalog file"));
    }
}
