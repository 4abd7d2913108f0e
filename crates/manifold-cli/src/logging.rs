use std::io;

use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "manifold=info";

/// Install the global subscriber. Logs always go to stderr so stdout stays
/// parseable.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let human = (!json).then(|| fmt::layer().with_writer(io::stderr).with_target(false));
    let machine = json.then(|| fmt::layer().json().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(human)
        .with(machine)
        .init();
}
