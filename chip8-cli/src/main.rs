//! Entrypoint for CLI
use std::{
    env, fs, thread,
    time::{Duration, Instant},
};

use chip8::{constants::*, prelude::*, Hz, IMPL_VERSION};
use log::{debug, error, info, warn};

static USAGE: &str = r#"
usage: chip8 [OPTIONS] FILE

options:
    --hz N       Instructions executed per second (default 500)
    --steps N    Stop after N instructions

examples:
    chip8 maze.rom
    chip8 --hz 1000 --steps 5000 breakout.rom
"#;

// FreeBSD sysexits
const EX_USAGE: i32 = 64;
const EX_NOINPUT: i32 = 66;
const EX_SOFTWARE: i32 = 70;

/// Upper bound on instructions when no step count is given.
const MAX_STEPS: usize = 10_000_000;

fn main() {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    let args = match parse_args(env::args().skip(1)) {
        Some(args) => args,
        None => {
            print_usage();
            std::process::exit(EX_USAGE)
        }
    };

    let mut vm = match load(&args) {
        Ok(vm) => vm,
        Err(err) => {
            error!("failed to load {}: {err}", args.filepath);
            std::process::exit(EX_NOINPUT)
        }
    };

    let result = run(&mut vm, args.steps.unwrap_or(MAX_STEPS));

    match vm.dump_display() {
        Ok(screen) => println!("{screen}"),
        Err(err) => error!("{err}"),
    }

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(EX_SOFTWARE)
    }
}

fn load(args: &Args) -> Chip8Result<Chip8Vm> {
    let bytecode = fs::read(&args.filepath)?;

    let mut vm = Chip8Vm::new(Chip8Conf {
        clock_frequency: args.clock_frequency,
        ..Default::default()
    });
    vm.load_bytecode(bytecode.as_slice())?;

    info!("loaded {} ({} bytes)", args.filepath, bytecode.len());

    Ok(vm)
}

/// Drive the VM from wall-clock time until the program stops making progress.
fn run(vm: &mut Chip8Vm, step_count: usize) -> Chip8Result<()> {
    let start = Instant::now();
    let mut last = start;

    while vm.cycle_count() < step_count {
        let now = Instant::now();
        let flow = vm.advance(now.duration_since(last))?;
        last = now;

        if vm.take_tone() {
            info!("beep");
        }

        if vm.take_redraw() {
            debug!("display changed after {} cycles", vm.cycle_count());
        }

        match flow {
            Flow::KeyWait => {
                // There is no input producer to release the machine.
                warn!("program is waiting for a key press, stopping");
                break;
            }
            Flow::Jump if is_halted(vm) => {
                info!("program halted at 0x{:03X}", vm.cpu().pc());
                break;
            }
            _ => {}
        }

        thread::sleep(Duration::from_millis(1));
    }

    info!(
        "ran {} cycles in {}ms",
        vm.cycle_count(),
        start.elapsed().as_millis()
    );

    Ok(())
}

/// Programs conventionally end in a jump to itself.
fn is_halted(vm: &Chip8Vm) -> bool {
    let pc = vm.cpu().pc();
    vm.memory().fetch(pc as usize) == Some(0x1000 | pc)
}

struct Args {
    filepath: String,
    clock_frequency: Hz,
    steps: Option<usize>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Args> {
    let mut filepath = None;
    let mut clock_frequency = Hz(CLOCK_FREQUENCY);
    let mut steps = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--hz" => clock_frequency = Hz(consume_number(&mut args)?),
            "--steps" => steps = Some(consume_number(&mut args)? as usize),
            "-h" | "--help" => return None,
            _ if filepath.is_none() => filepath = Some(arg),
            _ => return None,
        }
    }

    Some(Args {
        filepath: filepath?,
        clock_frequency,
        steps,
    })
}

/// Consumes the next argument as a number.
fn consume_number(args: &mut impl Iterator<Item = String>) -> Option<u64> {
    args.next()?.parse().ok()
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(line: &str) -> Option<Args> {
        parse_args(line.split_whitespace().map(String::from))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args("maze.rom").unwrap();
        assert_eq!(parsed.filepath, "maze.rom");
        assert_eq!(parsed.clock_frequency, Hz(CLOCK_FREQUENCY));
        assert_eq!(parsed.steps, None);

        let parsed = args("--hz 1000 --steps 20 maze.rom").unwrap();
        assert_eq!(parsed.clock_frequency, Hz(1000));
        assert_eq!(parsed.steps, Some(20));
    }

    #[test]
    fn test_parse_args_usage() {
        assert!(args("").is_none());
        assert!(args("--hz").is_none());
        assert!(args("--hz fast maze.rom").is_none());
        assert!(args("maze.rom other.rom").is_none());
        assert!(args("--help").is_none());
    }

    #[test]
    fn test_halt_detection() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_bytecode(&[0x60, 0x01, 0x12, 0x02]).unwrap();

        assert!(!is_halted(&vm));
        vm.run_steps(2).unwrap();
        assert!(is_halted(&vm));
    }

    #[test]
    fn test_run_bounded() {
        let mut vm = Chip8Vm::new(Chip8Conf {
            clock_frequency: Hz(100_000),
            ..Default::default()
        });
        vm.load_bytecode(&[0x70, 0x01, 0x12, 0x00]).unwrap();

        run(&mut vm, 100).unwrap();
        assert!(vm.cycle_count() >= 100);
    }
}
