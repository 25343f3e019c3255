//! # bindfig demo application
//!
//! A small program that declares a handful of bindings on a settings type and
//! walks through their lifecycle against a real file. It exists to
//! demonstrate and manually verify bindfig's behavior.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example bindfig_demo
//! cargo run --example bindfig_demo -- demo.toml
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                  | How to exercise it                                               |
//! |--------------------------|------------------------------------------------------------------|
//! | Default seeding          | Run once against a missing file, then inspect the file           |
//! | Format by extension      | Pass a `.ini`, `.toml`, `.json` or `.env` path                    |
//! | Validated assignment     | The out-of-range port assignment is rejected and nothing changes |
//! | Collections              | `tags` is stored as `demo,a\,b`                                  |
//! | Named enumerations       | `mode` is stored as `fast` / `slow`                              |
//! | Durations                | `timeout` is stored as `PT30S`                                   |
//! | External edits           | Edit the file between runs; the next run reads your value        |
//! | Deferred writes          | `retries` only reaches the file on `persist()`                   |

use once_cell::sync::Lazy;

use bindfig::enums::ConfigEnum;
use bindfig::{
    Binding, BindfigError, Boolean, Converter, ConverterExt, DurationIso, Integer, List, Location,
    Named, Text, Validated,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Fast,
    Slow,
}

impl ConfigEnum for Mode {
    const TYPE_NAME: &'static str = "Mode";
    const MEMBERS: &'static [Self] = &[Mode::Fast, Mode::Slow];

    fn name(&self) -> &'static str {
        match self {
            Mode::Fast => "fast",
            Mode::Slow => "slow",
        }
    }
}

struct DemoSettings;

static PORT: Lazy<Binding<Validated<Integer>>> = Lazy::new(|| {
    Binding::builder(Integer.bounded(1..=65535), 8080)
        .owner::<DemoSettings>()
        .attribute("port")
        .on_change(|event| println!("  port changed: {:?} -> {}", event.old, event.new))
        .build()
        .expect("valid port binding")
});

static VERBOSE: Lazy<Binding<Boolean>> = Lazy::new(|| {
    Binding::builder(Boolean, false)
        .owner::<DemoSettings>()
        .attribute("verbose")
        .build()
        .expect("valid verbose binding")
});

static MODE: Lazy<Binding<Named<Mode>>> = Lazy::new(|| {
    Binding::builder(Named::new(), Mode::Fast)
        .owner::<DemoSettings>()
        .attribute("mode")
        .build()
        .expect("valid mode binding")
});

static TAGS: Lazy<Binding<List<Text>>> = Lazy::new(|| {
    Binding::builder(Text.list(), vec!["demo".to_string()])
        .owner::<DemoSettings>()
        .attribute("tags")
        .build()
        .expect("valid tags binding")
});

static TIMEOUT: Lazy<Binding<DurationIso>> = Lazy::new(|| {
    Binding::builder(DurationIso, chrono::TimeDelta::seconds(30))
        .section("Network")
        .option("timeout")
        .build()
        .expect("valid timeout binding")
});

static RETRIES: Lazy<Binding<Integer>> = Lazy::new(|| {
    Binding::builder(Integer, 3)
        .section("Network")
        .option("retries")
        .write_on_edit(false)
        .build()
        .expect("valid retries binding")
});

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), BindfigError> {
    let context = match std::env::args().nth(1) {
        Some(path) => bindfig::set_path(path)?,
        None => bindfig::set_location(&Location::Cwd, "bindfig-demo.ini")?,
    };

    println!("Current values:");
    println!("  port    = {}", PORT.get()?);
    println!("  verbose = {}", VERBOSE.get()?);
    println!("  mode    = {:?}", MODE.get()?);
    println!("  tags    = {:?}", TAGS.get()?);
    println!("  timeout = {}", DurationIso.format(&TIMEOUT.get()?));
    println!("  retries = {}", RETRIES.get()?);

    println!("\nAssigning port = 70000:");
    match PORT.set(70000) {
        Ok(()) => println!("  accepted (unexpected)"),
        Err(e) => println!("  rejected: {e}"),
    }

    println!("\nAssigning new values:");
    PORT.set(PORT.get()? + 1)?;
    MODE.set(match MODE.get()? {
        Mode::Fast => Mode::Slow,
        Mode::Slow => Mode::Fast,
    })?;
    TAGS.set(vec!["demo".into(), "a,b".into()])?;
    RETRIES.set(RETRIES.get()? + 1)?;
    bindfig::persist()?;

    println!("\nStored entries:");
    println!("{}", context.listing()?);
    Ok(())
}
