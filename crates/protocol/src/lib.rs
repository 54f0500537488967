// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! aof-protocol: the inter-agent message envelope and the router that
//! validates, authorizes, and applies it to the task store.

pub mod envelope;
pub mod payload;
pub mod router;

pub use envelope::{Envelope, MessageType};
pub use payload::{
    CompletionOutcome, CompletionReportPayload, HandoffAckPayload, HandoffRequestPayload,
    StatusUpdatePayload,
};
pub use router::{ProjectHandle, ProjectResolver, ProtocolError, Router, RouterConfig, StaticResolver};
