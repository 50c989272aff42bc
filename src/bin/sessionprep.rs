/**
 * sessionprep
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

extern crate getopts;
extern crate sessionprep;
extern crate tracing;
extern crate tracing_subscriber;

use std::env;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use getopts::{Matches, Options};
use tracing_subscriber::EnvFilter;

use sessionprep::config::{Operation, PipelineConfig};

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let opts = options();

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts, None);
        return;
    }

    let config = match configure(&matches) {
        Ok(config) => config,
        Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint)),
    };

    if config.operation == Operation::All {
        tracing::warn!(
            "The user store at {} will be deleted and rebuilt",
            config.user_store_dir.display());
    }

    if let Err(error) = sessionprep::run(&config) {
        tracing::error!("{}", error);
        process::exit(1);
    }
}

fn options() -> Options {

    let mut opts = Options::new();

    opts.optopt("c", "config", "JSON configuration file (optional). Command line options \
        override its values.", "PATH");
    opts.optopt("p", "path", "Input file with one interaction per line (required unless \
        --op split is given).", "PATH");
    opts.optopt("", "user-dir", "Directory of the per-user records (defaults to data/users). \
        WARNING: its contents are deleted when all stages run.", "PATH");
    opts.optopt("o", "output-dir", "Directory for the split files (defaults to data/processed).",
        "PATH");
    opts.optopt("", "max-valid-seq-len", "Sessions longer than this are dropped (defaults to 500).",
        "NUMBER");
    opts.optopt("", "max-session-len", "Maximum session length after cutting (defaults to 10).",
        "NUMBER");
    opts.optopt("", "min-occur", "Items occurring fewer times are removed (defaults to 10).",
        "NUMBER");
    opts.optopt("", "time-interval", "Inactivity in seconds which ends a session (defaults to \
        3600).", "SECONDS");
    opts.optopt("u", "user-column", "Position of the user id (defaults to 0).", "NUMBER");
    opts.optopt("i", "item-column", "Position of the item id (defaults to 5).", "NUMBER");
    opts.optopt("t", "timestamp-column", "Position of the timestamp (defaults to 1).", "NUMBER");
    opts.optopt("", "time-format", "strftime format of the timestamps (defaults to \
        %Y-%m-%dT%H:%M:%S%Z).", "FORMAT");
    opts.optflag("", "raw-timestamps", "Timestamps are epoch seconds, do not parse them.");
    opts.optopt("", "sep", "Field separator, a single character (defaults to tab).", "CHAR");
    opts.optopt("", "prefix", "Prefix of the output file names.", "PREFIX");
    opts.optopt("", "suffix", "Suffix of the output file names.", "SUFFIX");
    opts.optopt("", "op", "'all' preprocesses the input and splits sessions, 'split' only splits \
        sessions from an existing user store (defaults to all).", "all|split");
    opts.optopt("", "dataset", "Dataset name for dataset specific filtering (defaults to the \
        prefix).", "NAME");
    opts.optopt("", "min-user-sessions", "Users with fewer valid sessions are removed (defaults \
        to 5).", "NUMBER");
    opts.optopt("n", "num-workers", "Number of threads for cutting sessions (defaults to the \
        number of CPUs).", "NUMBER");
    opts.optflag("h", "help", "Print this help menu");

    opts
}

fn configure(matches: &Matches) -> Result<PipelineConfig, String> {

    let mut config = match matches.opt_str("c") {
        Some(path) => PipelineConfig::from_json_file(&path).map_err(|error| error.to_string())?,
        None => PipelineConfig::default(),
    };

    if let Some(path) = matches.opt_str("p") {
        config.input_path = Some(PathBuf::from(path));
    }
    if let Some(dir) = matches.opt_str("user-dir") {
        config.user_store_dir = PathBuf::from(dir);
    }
    if let Some(dir) = matches.opt_str("o") {
        config.output_dir = PathBuf::from(dir);
    }

    override_with(matches, "max-valid-seq-len", &mut config.max_valid_seq_len)?;
    override_with(matches, "max-session-len", &mut config.max_session_len)?;
    override_with(matches, "min-occur", &mut config.min_occurrences)?;
    override_with(matches, "time-interval", &mut config.time_interval)?;
    override_with(matches, "u", &mut config.user_column)?;
    override_with(matches, "i", &mut config.item_column)?;
    override_with(matches, "t", &mut config.timestamp_column)?;
    override_with(matches, "min-user-sessions", &mut config.min_user_sessions)?;

    if let Some(format) = matches.opt_str("time-format") {
        config.time_format = Some(format);
    }
    if matches.opt_present("raw-timestamps") {
        config.time_format = None;
    }

    if let Some(separator) = matches.opt_str("sep") {
        let mut chars = separator.chars();
        config.separator = match (chars.next(), chars.next()) {
            (Some(separator), None) => separator,
            _ => return Err(format!("Problem with option 'sep': '{}' is not a single character",
                separator)),
        };
    }

    if let Some(prefix) = matches.opt_str("prefix") {
        config.prefix = prefix;
    }
    if let Some(suffix) = matches.opt_str("suffix") {
        config.suffix = suffix;
    }

    if let Some(operation) = matches.opt_str("op") {
        config.operation = Operation::from_name(&operation)
            .ok_or_else(|| format!("Problem with option 'op': unknown operation '{}'", operation))?;
    }

    if let Some(dataset) = matches.opt_str("dataset") {
        config.dataset = Some(dataset);
    }

    let mut num_workers = 0;
    override_with(matches, "n", &mut num_workers)?;
    if num_workers > 0 {
        config.num_workers = Some(num_workers);
    }

    config.validate().map_err(|error| error.to_string())?;

    Ok(config)
}

fn override_with<T: FromStr>(matches: &Matches, name: &str, value: &mut T) -> Result<(), String>
    where T::Err: ToString {

    if let Some(raw) = matches.opt_str(name) {
        *value = raw.parse()
            .map_err(|failure: T::Err| format!("Problem with option '{}': {}", name, failure.to_string()))?;
    }

    Ok(())
}

fn print_usage(program: &str, opts: &Options, hint: Option<&str>) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

fn print_usage_and_exit(program: &str, opts: Options, hint: Option<&str>) {
    print_usage(program, &opts, hint);
    process::exit(2);
}
