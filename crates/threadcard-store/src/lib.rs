//! Record-store boundary for threadcard.
//!
//! - [`client`]: the [`RecordStore`] collaborator trait and its REST client
//! - [`memory`]: an in-process store with the same observable behavior
//! - [`schema`]: raw schema to UI-ready property descriptors
//! - [`codec`]: typed values to and from the store's wire form
//! - [`blocks`]: rich text runs and record body content
//! - [`display`]: records rendered as chat cards

pub mod blocks;
pub mod client;
pub mod codec;
pub mod display;
pub mod error;
pub mod memory;
pub mod people;
pub mod record;
pub mod schema;

pub use blocks::{parse_rich_text, parse_summary_to_blocks, ContentBlock, TextRun};
pub use client::{HttpRecordStore, RecordStore};
pub use codec::{decode_property, encode_properties, from_wire_value, parse_date, to_store_value};
pub use display::{format_record, record_title, RecordCard, UNTITLED};
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use people::{PeopleDirectory, Person};
pub use record::{FilterOp, Record, RecordFilter};
pub use schema::{extract_collection_id, find_descriptor, interaction_schema, normalize_schema};
