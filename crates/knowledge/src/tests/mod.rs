//! End-to-end scenarios over `QaService` with stub backends.

mod scenarios;
mod support;
