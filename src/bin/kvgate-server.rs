use std::process::exit;

use failure::Fail;
use log::error;

use kvgate::config::{app, Config};

fn main() {
    env_logger::init();

    let matches = app().get_matches();

    let res = Config::from_matches(&matches).and_then(|config| kvgate::server::run(&config));

    if let Err(e) = res {
        error!("{}", e);
        let mut cause = e.cause();
        while let Some(c) = cause {
            error!("caused by: {}", c);
            cause = c.cause();
        }
        exit(1);
    }
}
