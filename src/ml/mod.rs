// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The burn-specific model code lives here. The only other burn
// users are the WindowBatcher (data layer) and the checkpoint
// loader (infra layer).
//
// What's in this layer:
//
//   model.rs      — The transformer encoder architecture
//                   • Token embeddings
//                   • Positional embeddings
//                   • Multi-head self-attention with a padding mask
//                   • Feed-forward networks (GELU activation)
//                   • Layer normalisation
//                   • Residual connections
//                   • Span head: start and end logit per token
//
//   inferencer.rs — The inference engine
//                   Loads a checkpoint on the right backend
//                   and implements the SpanModel trait the
//                   reader talks to
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

/// Transformer encoder span model architecture
pub mod model;

/// SpanModel implementation backed by burn
pub mod inferencer;
