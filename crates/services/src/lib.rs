#![forbid(unsafe_code)]

pub mod catalog_file;
pub mod config;
pub mod error;
pub mod persistence;
pub mod report;
pub mod retry;
pub mod sessions;

pub use study_core::Clock;
pub use sessions as session;

pub use catalog_file::{demo_catalog, load_catalog, parse_catalog};
pub use config::StudyConfig;
pub use error::{ConfigError, PersistenceError, SessionError, StudyError};
pub use persistence::{FlushMode, PersistenceAdapter};
pub use report::{ConsistencyCheck, MarketSnapshot, StudyReport};
pub use retry::RetryPolicy;

pub use sessions::{
    AnswerOutcome, ScoreReport, SessionController, SessionProgress, SessionState,
    StudyLoopService,
};
