//! Core wire types for the linkmesh link protocol.
//!
//! This crate is the single source of truth for the shapes that cross a
//! link: [`Role`], [`LinkSpec`] and [`Envelope`]. Nothing here knows about
//! transports, schemas or dispatch — those live in `linkmesh-transport`,
//! `linkmesh-schema` and `linkmesh-link` respectively.

mod envelope;
mod role;

pub use envelope::{Envelope, EnvelopeKind, Seq};
pub use role::{LinkSpec, LinkSpecParseError, Role, RoleParseError};
