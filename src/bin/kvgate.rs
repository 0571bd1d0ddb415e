use std::io::Write;
use std::path::Path;
use std::process::exit;
use std::time::Duration;

use clap::{App, AppSettings, Arg, SubCommand};

use kvgate::sled::SledKvsEngine;
use kvgate::{Gateway, Key, Reply, Result};

fn main() -> Result<()> {
    env_logger::init();

    let db_arg = Arg::with_name("db")
        .long("db")
        .takes_value(true)
        .help("location of the database")
        .default_value("reststore.db");
    let bucket_arg = Arg::with_name("bucket")
        .long("bucket")
        .takes_value(true)
        .help("name of the bucket holding all pairs")
        .default_value("kv");

    let matches = App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Work on a kvgate database without going through the server")
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(db_arg.global(true))
        .arg(bucket_arg.global(true))
        .subcommand(
            SubCommand::with_name("get")
                .about("get value for given key")
                .arg(Arg::with_name("KEY").required(true)),
        )
        .subcommand(
            SubCommand::with_name("set")
                .about("set key with the given value")
                .arg(Arg::with_name("KEY").required(true))
                .arg(Arg::with_name("VALUE").default_value("")),
        )
        .subcommand(
            SubCommand::with_name("rm")
                .about("remove value for the given key")
                .arg(Arg::with_name("KEY").required(true)),
        )
        .subcommand(SubCommand::with_name("ls").about("list every pair"))
        .get_matches();

    let (name, sub) = matches.subcommand();
    let sub = match sub {
        Some(sub) => sub,
        // clap enforces a subcommand.
        None => unreachable!(),
    };

    let db = sub
        .value_of_os("db")
        .or_else(|| matches.value_of_os("db"))
        .unwrap_or_default();
    let bucket = sub
        .value_of("bucket")
        .or_else(|| matches.value_of("bucket"))
        .unwrap_or("kv");
    let engine = SledKvsEngine::open(Path::new(db), bucket, Duration::from_secs(1))?;
    let gateway = Gateway::new(engine);

    let key = sub.value_of("KEY").and_then(Key::new);

    let reply = match (name, key) {
        ("ls", _) => gateway.list_all(),
        (_, None) => Reply::MissingKey,
        ("get", Some(key)) => gateway.retrieve(&key),
        ("set", Some(key)) => gateway.store(&key, sub.value_of("VALUE").unwrap_or("")),
        ("rm", Some(key)) => gateway.delete(&key),
        _ => unreachable!(),
    };

    std::io::stdout().write_all(&reply.body())?;

    match reply.status() {
        200 => Ok(()),
        500 => exit(2),
        _ => exit(1),
    }
}
