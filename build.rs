//! Build script that ensures Cargo rebuilds when migrations change.
//!
//! `embed_migrations!` reads the migration files at compile time, but Cargo
//! cannot detect on its own when those files change. Emitting a
//! `rerun-if-changed` directive keeps incremental builds in sync with new or
//! edited migrations.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
