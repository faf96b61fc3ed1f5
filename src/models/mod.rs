pub mod activity;
pub mod alert;
pub mod brief;
pub mod manual;
pub mod profile;
pub mod risk;
pub mod snapshot;

pub use activity::Activity;
pub use alert::Alert;
pub use brief::{AiBrief, BriefInput, BriefSignal, BriefSuggestion};
pub use manual::{ManualDaily, ManualInput};
pub use profile::{ProfilePatch, UserProfile};
pub use risk::Risk;
pub use snapshot::{Snapshot, SnapshotInput, SnapshotMetrics};
