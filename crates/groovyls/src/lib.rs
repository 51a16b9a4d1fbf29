//! Command-line tools for Groovy language server compiler sessions.
//!
//! - `groovyls-reconcile`: Reconcile a workspace once and report the
//!   resulting session (classpath, source records, errors)
//!
//! # Example Usage
//!
//! ```bash
//! groovyls-reconcile ./project -c 'libs/*' --open src/Main.groovy
//! groovyls-reconcile ./project --format json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
