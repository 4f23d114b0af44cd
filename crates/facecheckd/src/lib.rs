//! facecheckd — HTTP front end for facecheck.
//!
//! `POST /compare` takes a multipart upload with a `captured_image` and up to
//! two reference images (`image1`, `image2`), runs one comparison leg per
//! reference concurrently, and answers with the best match:
//!
//! ```json
//! { "matchFound": true, "similarity": 97.5, "matchedImage": "image1" }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Backend, Config, ConfigError};
pub use engine::{MatchEngine, Reference};
pub use error::{ServerError, ServerResult};
pub use server::{build_router, serve};
pub use state::AppState;
