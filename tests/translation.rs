use vack::{
    emulator::{Emulator, TestIo},
    translator::{translate, Prologue},
    vm::{ArithmeticOp, Command, Program, Segment},
};

macro_rules! assert_ram {
    ($emulator:expr, $address:expr, $value:expr) => {
        assert_eq!($emulator.ram($address), $value, "RAM[{}] != {}", $address, $value);
    };
}

const SP: u16 = 0;
const LCL: u16 = 1;
const ARG: u16 = 2;
const THIS: u16 = 3;
const THAT: u16 = 4;

fn run(file: &str, program: &Program) -> Emulator<TestIo> {
    let assembly = translate(vec![(file, program)], Prologue::Test).unwrap();
    let rom = assembly.resolve().unwrap();

    let mut emulator = Emulator::new(rom, TestIo::new());
    emulator.run_limited(1_000_000).unwrap();

    emulator
}

fn run_source(file: &str, source: &str) -> Emulator<TestIo> {
    run(file, &Program::parse(source).unwrap())
}

fn assert_frame_untouched(emulator: &Emulator<TestIo>) {
    assert_ram!(emulator, LCL, 3000);
    assert_ram!(emulator, ARG, 3010);
    assert_ram!(emulator, THIS, 3020);
    assert_ram!(emulator, THAT, 3030);
}

/// Pushes `value`, which may be negative, using only constants and arithmetic.
fn push_value(program: &mut Program, value: i16) {
    let push = |program: &mut Program, n: u16| program.push(Command::Push(Segment::Constant, n));

    match value {
        i16::MIN => {
            push(program, 32767);
            program.push(ArithmeticOp::Neg.into());
            push(program, 1);
            program.push(ArithmeticOp::Sub.into());
        },
        v if v < 0 => {
            push(program, (-v) as u16);
            program.push(ArithmeticOp::Neg.into());
        },
        v => push(program, v as u16),
    }
}

#[test]
fn test_comparisons_do_not_overflow() {
    let emulator = run_source("Overflow", include_str!("fixtures/overflow.vm"));

    assert_ram!(emulator, 16, i16::MIN);
    assert_ram!(emulator, 256, -1);
    assert_ram!(emulator, 257, 0);
    assert_ram!(emulator, 258, -1);
    assert_ram!(emulator, 259, -1);
    assert_ram!(emulator, 260, 0);
    assert_ram!(emulator, SP, 261);
}

#[test]
fn test_comparisons_over_extreme_values() {
    let values = [i16::MIN, i16::MIN + 1, -300, -1, 0, 1, 300, i16::MAX - 1, i16::MAX];
    let ops = [ArithmeticOp::Eq, ArithmeticOp::Gt, ArithmeticOp::Lt];

    let mut program = Program::new();
    let mut expected = Vec::new();

    for &x in &values {
        for &y in &values {
            for &op in &ops {
                push_value(&mut program, x);
                push_value(&mut program, y);
                program.push(op.into());

                let result = match op {
                    ArithmeticOp::Eq => x == y,
                    ArithmeticOp::Gt => x > y,
                    _ => x < y,
                };

                expected.push(if result { -1 } else { 0 });
            }
        }
    }

    let emulator = run("Compare", &program);

    for (i, value) in expected.iter().enumerate() {
        assert_ram!(emulator, 256 + i as u16, *value);
    }

    assert_ram!(emulator, SP, 256 + expected.len() as i16);
}

#[test]
fn test_arithmetic_stack_effect() {
    let cases = [
        (ArithmeticOp::Add, 9 + 4, -1),
        (ArithmeticOp::Sub, 9 - 4, -1),
        (ArithmeticOp::And, 9 & 4, -1),
        (ArithmeticOp::Or, 9 | 4, -1),
        (ArithmeticOp::Gt, -1, -1),
        (ArithmeticOp::Neg, -4, 0),
        (ArithmeticOp::Not, !4, 0),
    ];

    for &(op, result, effect) in &cases {
        let mut program = Program::new();
        push_value(&mut program, 9);
        push_value(&mut program, 4);
        program.push(op.into());

        let emulator = run("Stack", &program);

        assert_ram!(emulator, SP, 258 + effect);
        assert_ram!(emulator, (emulator.ram(SP) - 1) as u16, result);
        assert_frame_untouched(&emulator);
    }
}

#[test]
fn test_segments() {
    let emulator = run_source("Segments", "
        push constant 10
        pop local 0
        push constant 21
        pop argument 1
        push constant 3333
        pop pointer 1
        push constant 36
        pop that 6
        push constant 42
        pop temp 6
        push constant 510
        pop static 8
        push local 0
        push argument 1
        add
        push that 6
        add
        push temp 6
        add
        push static 8
        add
    ");

    assert_ram!(emulator, 3000, 10);
    assert_ram!(emulator, 3011, 21);
    assert_ram!(emulator, THAT, 3333);
    assert_ram!(emulator, 3339, 36);
    assert_ram!(emulator, 11, 42);
    assert_eq!(emulator.symbol("Segments.8"), Some(510));
    assert_ram!(emulator, 256, 10 + 21 + 36 + 42 + 510);
    assert_ram!(emulator, SP, 257);
}

#[test]
fn test_call_restores_caller_frame() {
    let emulator = run_source("Calls", include_str!("fixtures/calls.vm"));

    // Two arguments replaced by one return value.
    assert_ram!(emulator, SP, 257);
    assert_ram!(emulator, 256, 12);
    assert_ram!(emulator, 4000, 1);
    assert_frame_untouched(&emulator);
}

#[test]
fn test_recursion() {
    let emulator = run_source("Main", include_str!("fixtures/fibonacci.vm"));

    assert_ram!(emulator, 256, 144);
    assert_ram!(emulator, SP, 257);
    assert_frame_untouched(&emulator);
}

#[test]
fn test_uart_segment() {
    let program = Program::parse("
        push constant 111
        pop uart 0
        push constant 107
        pop uart 0
        push uart 1
        push uart 2
    ").unwrap();

    let assembly = translate(vec![("Uart", &program)], Prologue::Test).unwrap();
    let mut io = TestIo::with_input(vec![33]);

    let mut emulator = Emulator::new(assembly.resolve().unwrap(), &mut io);
    emulator.run_limited(10_000).unwrap();

    assert_ram!(emulator, 256, 33);
    assert_ram!(emulator, 257, 0b10);
    drop(emulator);

    assert_eq!(io.output_string(), "ok");
}

#[test]
fn test_listing_survives_reparsing() {
    let program = Program::parse(include_str!("fixtures/fibonacci.vm")).unwrap();
    let assembly = translate(vec![("Main", &program)], Prologue::Runtime).unwrap();

    let text = assembly.to_string();
    let reparsed = vack::assembly::Program::parse(&text).unwrap();

    assert_eq!(
        reparsed.instructions().collect::<Vec<_>>(),
        assembly.instructions().collect::<Vec<_>>(),
    );
}
