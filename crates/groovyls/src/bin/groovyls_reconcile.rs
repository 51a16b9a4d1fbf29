//! Reconcile a Groovy workspace and report the compiler session.

use std::process::ExitCode;

fn main() -> ExitCode {
    groovyls::cmd::reconcile::main()
}
