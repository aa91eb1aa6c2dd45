// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire-level messages and clients.
//!
//! These mirror the shapes `protoc` would emit for `google/longrunning/operations.proto`
//! and `google/rpc/status.proto`; only the pieces the waiter needs are kept.

pub mod longrunning;
