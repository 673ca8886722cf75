use crate::dataset::Dataset;
use anyhow::Result;
use log::{debug, info};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Something that can materialize the full production dataset.
pub trait DatasetSource {
    /// Where the data comes from, for log messages.
    fn label(&self) -> String;
    fn load(&self) -> Result<Dataset>;
}

/// Production CSV on disk.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for CsvSource {
    fn label(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn load(&self) -> Result<Dataset> {
        super::csv::load_production_csv(&self.path)
    }
}

/// Single-entry memo around a [`DatasetSource`].
///
/// The first [`get`](Self::get) loads and stores the dataset; later calls hand out the
/// same `Rc`. Only [`refresh`](Self::refresh) and [`invalidate`](Self::invalidate) drop
/// the entry.
pub struct DatasetCache<S: DatasetSource> {
    source: S,
    entry: RefCell<Option<Rc<Dataset>>>,
}

impl<S: DatasetSource> DatasetCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entry: RefCell::new(None),
        }
    }

    pub fn get(&self) -> Result<Rc<Dataset>> {
        if let Some(dataset) = self.entry.borrow().as_ref() {
            debug!("dataset cache hit for {}", self.source.label());
            return Ok(Rc::clone(dataset));
        }
        info!("loading dataset from {}", self.source.label());
        let dataset = Rc::new(self.source.load()?);
        *self.entry.borrow_mut() = Some(Rc::clone(&dataset));
        Ok(dataset)
    }

    /// Drop the cached entry and reload from the source.
    pub fn refresh(&self) -> Result<Rc<Dataset>> {
        self.invalidate();
        self.get()
    }

    pub fn invalidate(&self) {
        self.entry.borrow_mut().take();
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.borrow().is_some()
    }
}
