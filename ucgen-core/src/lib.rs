//! Universal circuit compiler core.
//!
//! Compiles a boolean circuit of known structure into a *universal circuit*:
//! a fixed-topology circuit of X/Y switches and universal gates whose
//! behaviour, once programmed with a set of control bits, simulates the
//! original circuit while hiding which circuit was simulated.
//!
//! The pipeline is strictly single-threaded: gate list → fanout-2
//! normalisation → Γ₂ supergraph → recursive edge two-colouring →
//! edge-universal graph skeleton → edge embedding → topological numbering →
//! circuit + programming files.

pub mod compiler;
