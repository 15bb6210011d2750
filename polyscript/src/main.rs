use clap::Parser as ClapParser;
use std::{
    fs,
    io::{self, Write},
    process,
};

use polyscript::{Block, Stack, VirtualMachine, VmCreateInfo, Workspace, definition};

const MAIN_STACK: &str = "Poly";

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Workspace files, concatenated in order
    #[arg(required = false, help = "The workspace files to load")]
    files: Vec<String>,

    /// Stack to run
    #[arg(long, default_value = MAIN_STACK, help = "Stack to evaluate, falls back to the first stack")]
    stack: String,

    /// Input definition text, or @FILE to read it from a file
    #[arg(long, help = "Input records like `#x { 1 2 }` or @FILE")]
    inputs: Option<String>,

    /// Machine state JSON file
    #[arg(long, help = "Load object memory from a JSON file")]
    state: Option<String>,

    #[arg(long, help = "Step limit for one evaluation")]
    max_steps: Option<usize>,

    #[arg(long, help = "Seed for random blocks")]
    seed: Option<u64>,

    #[arg(short, long, help = "Trace every step")]
    verbose: bool,

    /// Start a REPL after loading the files
    #[arg(long, help = "Read block lists from stdin")]
    repl: bool,

    /// Print the workspace as JSON records instead of running it
    #[arg(long, help = "Dump the workspace as stack definitions")]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut source = String::new();
    for filename in &cli.files {
        match fs::read_to_string(filename) {
            Ok(content) => {
                source.push_str(&content);
                source.push('\n');
            }
            Err(err) => {
                eprintln!("Error reading file '{}': {}", filename, err);
                process::exit(1);
            }
        }
    }

    let workspace = match Workspace::parse(&source) {
        Ok(workspace) => workspace,
        Err(err) => {
            eprintln!("Error parsing workspace: {}", err);
            process::exit(1);
        }
    };

    if cli.json {
        match definition::workspace_json_string(&workspace) {
            Ok(json) => println!("{}", json),
            Err(err) => {
                eprintln!("Error writing json: {}", err);
                process::exit(1);
            }
        }
        return;
    }

    let mut info = VmCreateInfo {
        verbose: cli.verbose,
        seed: cli.seed,
        ..Default::default()
    };
    if let Some(max_steps) = cli.max_steps {
        info.max_steps = max_steps;
    }
    let mut vm = VirtualMachine::with_info(info);
    vm.workspace = workspace;

    if let Some(path) = &cli.state {
        match fs::read_to_string(path) {
            Ok(serial) => vm.load_state(&serial),
            Err(err) => {
                eprintln!("Error reading state '{}': {}", path, err);
                process::exit(1);
            }
        }
    }

    if !cli.files.is_empty() {
        if let Err(err) = run_main(&mut vm, &cli) {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }

    if cli.repl || cli.files.is_empty() {
        run_repl(&mut vm);
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Trace);
    }
    builder.init();
}

fn read_inputs(arg: &str) -> io::Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path),
        None => Ok(arg.to_owned()),
    }
}

fn run_main(vm: &mut VirtualMachine, cli: &Cli) -> polyscript::Result<()> {
    let stack = match vm.workspace.get_stack(&cli.stack) {
        Some(stack) => stack,
        None => match vm.workspace.stacks().first() {
            Some(stack) => {
                log::warn!("no stack named {}, running {}", cli.stack, stack.borrow().name);
                stack.clone()
            }
            None => return Err(polyscript::Error::UnknownStack(cli.stack.clone())),
        },
    };

    vm.reset();
    // inputs go on the value stack first so the program can bind them
    if let Some(inputs) = &cli.inputs {
        vm.load_input_definition(&read_inputs(inputs)?)?;
    }
    let program = stack.borrow().clone();
    vm.insert_in_program(program);

    let result = vm.evaluate_fully();
    print_stack(&result);
    Ok(())
}

fn print_stack(blocks: &[Block]) {
    for (i, block) in blocks.iter().enumerate() {
        println!("[{:02}] {}", i, block);
    }
}

fn run_repl(vm: &mut VirtualMachine) {
    println!("Polyscript REPL");
    println!("Type 'exit' to quit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input_buffer = String::new();

    loop {
        print!("> ");
        if let Err(err) = stdout.flush() {
            eprintln!("Error flushing stdout: {}", err);
            break;
        }

        input_buffer.clear();
        match stdin.read_line(&mut input_buffer) {
            Ok(0) => break,
            Ok(_) => {
                let input = input_buffer.trim();
                if input == "exit" {
                    break;
                }
                if input.is_empty() {
                    continue;
                }

                match vm.workspace.parse_block_list(input) {
                    Ok(blocks) => {
                        // the value stack carries over between lines
                        let stack = std::mem::take(&mut vm.stack);
                        vm.reset();
                        vm.stack = stack;
                        vm.insert_in_program(Stack::with_blocks("repl", blocks));
                        let result = vm.evaluate_fully();
                        print_stack(&result);
                        vm.stack = result;
                    }
                    Err(err) => eprintln!("Error: {}", err),
                }
            }
            Err(err) => {
                eprintln!("Error reading input: {}", err);
                break;
            }
        }
    }
}
