use cvm_typeid::classfile::{ClassBlock, ClassLoader, ClassTable, LoaderConfig, LoaderId};
use cvm_typeid::typeid::{ExecEnv, TypeIdConfig, TypeIds};

use clap::{crate_version, value_parser, Arg, ArgAction, Command};
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

fn main() {
    env_logger::init();

    let matches = Command::new("Classfile loader")
        .version(crate_version!())
        .about("Load classfiles into interned class blocks and report on them")
        .arg(
            Arg::new("max constant pool")
                .long("max-constant-pool")
                .value_name("COUNT")
                .value_parser(value_parser!(usize))
                .help("Largest accepted constant pool count"),
        )
        .arg(
            Arg::new("no floating point")
                .long("no-floating-point")
                .action(ArgAction::SetTrue)
                .help("Reject floating-point constants and arguments"),
        )
        .arg(
            Arg::new("no name checks")
                .long("no-name-checks")
                .action(ArgAction::SetTrue)
                .help("Skip checking that class names are legal"),
        )
        .arg(
            Arg::new("loader")
                .long("loader")
                .value_name("ID")
                .value_parser(value_parser!(u32))
                .help("Define the classes with this loader instead of the bootstrap loader"),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .action(ArgAction::SetTrue)
                .help("Print the sizes of the type id tables at the end"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Classfiles to load, in order")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf)),
        )
        .get_matches();

    let mut config = LoaderConfig::default();
    if let Some(max) = matches.get_one::<usize>("max constant pool") {
        config.max_constant_pool_size = *max;
    }
    config.allow_floating_point = !matches.get_flag("no floating point");
    config.check_class_names = !matches.get_flag("no name checks");
    let loader_id = matches.get_one::<u32>("loader").map(|id| LoaderId(*id));

    let ids = match TypeIds::new(TypeIdConfig::default()) {
        Ok(ids) => Arc::new(ids),
        Err(err) => {
            eprintln!("Failed to set up type id tables: {}", err);
            process::exit(1);
        }
    };
    let loader = ClassLoader::new(ids.clone(), Arc::new(ClassTable::new()), config);

    let mut failures = 0;
    for (index, path) in matches
        .get_many::<PathBuf>("INPUT")
        .into_iter()
        .flatten()
        .enumerate()
    {
        log::info!("Reading '{}'", path.display());
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("{}: {}", path.display(), err);
                failures += 1;
                continue;
            }
        };
        match loader.load(ExecEnv(index as u32), &bytes, loader_id, None) {
            Ok(class) => print_class(&ids, &class),
            Err(err) => {
                eprintln!("{}: {}", path.display(), err);
                failures += 1;
            }
        }
    }

    if matches.get_flag("stats") {
        let stats = ids.stats();
        println!("classes:     {}", stats.classes);
        println!("packages:    {}", stats.packages);
        println!("names:       {}", stats.names);
        println!("method sigs: {}", stats.method_sigs);
        println!("forms:       {}", stats.forms);
        println!("members:     {}", stats.members);
    }

    if failures > 0 {
        process::exit(1);
    }
}

fn print_class(ids: &TypeIds, class: &ClassBlock) {
    let version = class.version();
    println!(
        "{} (version {}.{})",
        ids.class_name_to_string(class.id()),
        version.major_version,
        version.minor_version
    );
    if let Some(super_class) = class.super_class() {
        println!("  extends {}", ids.class_name_to_string(super_class));
    }
    for interface in class.interfaces() {
        println!("  implements {}", ids.class_name_to_string(*interface));
    }
    for field in class.fields() {
        println!(
            "  field {} {}",
            ids.member_name_to_string(field.id.name()),
            ids.field_type_to_string(field.id.ty())
        );
    }
    for method in class.methods() {
        let code_length = class.code(method).map_or(0, |code| code.bytecode().len());
        println!(
            "  method {}{} ({} bytes of code)",
            ids.member_name_to_string(method.id.name()),
            ids.method_sig_to_string(method.id.ty()),
            code_length
        );
    }
}
