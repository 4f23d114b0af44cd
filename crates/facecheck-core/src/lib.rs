//! facecheck-core — Decide whether a captured image matches one of two
//! reference images.
//!
//! Each pairwise check (a "leg") is delegated to a [`Comparator`]: either a
//! remote face-comparison API or a local perceptual hash. The
//! [`MatchPolicy`] then folds up to two leg results into one
//! [`MatchDecision`].

pub mod comparator;
pub mod phash;
pub mod policy;
pub mod remote;
pub mod types;

pub use comparator::{CompareError, Comparator};
pub use phash::{ImageHash, PerceptualComparator};
pub use policy::MatchPolicy;
pub use remote::{RemoteConfig, RemoteFaceComparator};
pub use types::{is_valid_score, ComparisonResult, Leg, MatchDecision};

/// Label of the first reference image, as named in upload forms and responses.
pub const FIRST_LABEL: &str = "image1";
/// Label of the second reference image.
pub const SECOND_LABEL: &str = "image2";
