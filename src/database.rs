use async_trait::async_trait;
use std::fmt::Debug;
use std::io::ErrorKind;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{trace, warn};

use crate::tank::{GasTank, TankConfig, TankSnapshot};

#[async_trait]
pub trait Database: Debug {
    type Error: std::error::Error;

    async fn set_state(&mut self, state: &TankSnapshot) -> Result<(), Self::Error>;

    async fn get_state(&self) -> Result<Option<TankSnapshot>, Self::Error>;

    async fn clear_state(&mut self) -> Result<(), Self::Error>;
}

/// Loads the persisted tank, or starts an empty one from `config` when
/// nothing was saved yet.
#[tracing::instrument(level = "trace", skip_all)]
pub async fn load_tank<DB: Database + Sync>(
    db: &DB,
    config: TankConfig,
) -> Result<GasTank, DB::Error> {
    match db.get_state().await? {
        Some(snapshot) => {
            if snapshot.config != config {
                warn!(
                    "Persisted configuration differs from the given one, keeping the persisted one => {:#?}",
                    snapshot.config
                );
            }
            Ok(GasTank::from_snapshot(snapshot))
        }
        None => {
            trace!("No persisted tank, starting a new one.");
            Ok(GasTank::new(config))
        }
    }
}

#[tracing::instrument(level = "trace", skip_all)]
pub async fn save_tank<DB: Database + Send>(db: &mut DB, tank: &GasTank) -> Result<(), DB::Error> {
    db.set_state(&tank.snapshot()).await
}

// Implementation using the file system.

#[derive(Debug, thiserror::Error)]
pub enum FileSystemDatabaseError {
    #[error("could not create file: {0}")]
    CreateFile(std::io::Error),

    #[error("could not convert string to JSON: {0}")]
    ToJSON(serde_json::Error),

    #[error("could not write to file: {0}")]
    WriteToFile(std::io::Error),

    #[error("could not read file to string: {0}")]
    ReadFile(std::io::Error),

    #[error("could not parse JSON to string: {0}")]
    ParseJSON(serde_json::Error),

    #[error("could not delete file: {0}")]
    DeleteFile(std::io::Error),
}

#[derive(Debug)]
pub struct FileSystemDatabase {
    path: String,
}

impl FileSystemDatabase {
    pub fn new(path: String) -> FileSystemDatabase {
        FileSystemDatabase { path }
    }
}

#[async_trait]
impl Database for FileSystemDatabase {
    type Error = FileSystemDatabaseError;

    async fn set_state(&mut self, state: &TankSnapshot) -> Result<(), Self::Error> {
        let mut file = fs::File::create(&self.path)
            .await
            .map_err(Self::Error::CreateFile)?;

        let s = serde_json::to_string_pretty(state).map_err(Self::Error::ToJSON)?;

        file.write_all(s.as_bytes())
            .await
            .map_err(Self::Error::WriteToFile)?;

        file.sync_all().await.map_err(Self::Error::WriteToFile)
    }

    async fn get_state(&self) -> Result<Option<TankSnapshot>, Self::Error> {
        match fs::File::open(&self.path).await {
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),

            Err(err) => Err(Self::Error::ReadFile(err)),

            Ok(mut file) => {
                let mut s = String::new();
                file.read_to_string(&mut s)
                    .await
                    .map_err(Self::Error::ReadFile)?;

                let state = serde_json::from_str(&s).map_err(Self::Error::ParseJSON)?;
                Ok(Some(state))
            }
        }
    }

    async fn clear_state(&mut self) -> Result<(), Self::Error> {
        fs::remove_file(&self.path)
            .await
            .map_err(Self::Error::DeleteFile)
    }
}
