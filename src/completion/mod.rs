// SPDX-License-Identifier: MIT
// Completion Client — cancellable requests to the assistant server and
// boundary normalization of its loosely-shaped responses.
//
// The client knows nothing about sessions or buffers: it turns a prefix
// into raw predicted text. `normalize` then reduces that text to one
// tagged outcome before the state machine sees it.

pub mod client;
pub mod normalize;

pub use client::{predicted_from_body, CompletionBackend, FetchError, HttpCompletionClient};
pub use normalize::{derive_suffix, CompletionOutcome};
