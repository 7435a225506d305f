mod payload;
mod record;
mod store;

pub use payload::parse_prefs_update;
pub use record::{parse_volume, FeedEntry, FeedingRecord, RecordSource, Volume, VolumeUnit};
pub use store::FeedingStore;
