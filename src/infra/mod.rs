// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs      — Loading model weights
//                        Uses Burn's recorders to read model
//                        parameters from disk, plus the JSON
//                        architecture file needed to rebuild
//                        the model first.
//
//   tokenizer_store.rs — Tokenizer loading
//                        A local tokenizer.json next to the
//                        weights, or a download from the hub.
//                        Also adapts the tokenizer to the
//                        TokenEncoder trait.
//
//   device.rs          — Device strings ("cpu", "gpu:0") and
//                        device maps.
//
//   secret.rs          — The hub token, read from environment
//                        variables when needed.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint loading (and saving)
pub mod checkpoint;

/// Tokenizer loading and the TokenEncoder adapter
pub mod tokenizer_store;

/// Compute devices and device maps
pub mod device;

/// Environment-variable backed secrets
pub mod secret;
