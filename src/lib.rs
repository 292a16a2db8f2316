// Library root
// -----------
// This crate exposes a small library surface shared by the two binaries
// (`pack-slides` and `upload-images`).
//
// Module responsibilities:
// - `config`: The persisted settings record backing the upload form
//   (`config.json` load/save).
// - `api`: Encapsulates HTTP interactions with the image-management
//   service (authentication, project/storage lookup, image upload).
// - `batch`: Submission validation and the sequential upload loop,
//   kept free of prompts so it can be tested with a stub service.
// - `packer`: Bundles each slide's companion files into one zip archive.
// - `ui`: Implements the terminal-based form flow and delegates to
//   `api` and `batch`.
//
// Keeping this separation makes it easier to test the upload and packing
// logic without a terminal or a reachable server.
pub mod api;
pub mod batch;
pub mod config;
pub mod packer;
pub mod ui;
