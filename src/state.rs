use crate::storage::Database;
use std::{path::PathBuf, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub logo_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(db: Database, logo_path: PathBuf) -> Self {
        Self {
            db,
            logo_path: Arc::new(logo_path),
        }
    }
}
