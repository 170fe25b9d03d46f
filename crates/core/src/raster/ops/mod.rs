//! Operator implementations by category.
//!
//! - `graphics_state`: q, Q, cm, w, J, j, M, d, gs
//! - `path`: m, l, c, v, y, h, re and the painting operators
//! - `color`: CS, cs, SC, SCN, sc, scn, G, g, RG, rg, K, k
//! - `text`: BT, Tf, Td, TD, Tm, T*, Tj, TJ
//! - `xobject`: Do and inline images

mod color;
mod graphics_state;
mod path;
mod text;
mod xobject;
