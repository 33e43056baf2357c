use std::collections::{BTreeMap, VecDeque};

use proptest::prelude::*;

use crate::{
    bus::{Input, IntcodeBus},
    channel::Channel,
    instruction::Opcode,
    machine::*,
    memory::IntcodeMemory,
};

/// Scripted inputs, collected outputs. Runs dry without closing.
#[derive(Default)]
struct TestBus {
    inputs: VecDeque<i64>,
    outputs: Vec<i64>,
}
impl TestBus {
    fn with_inputs(inputs: &[i64]) -> Self {
        Self {
            inputs: inputs.iter().copied().collect(),
            outputs: Vec::new(),
        }
    }
}
impl IntcodeBus for TestBus {
    fn read(&mut self) -> Input {
        self.inputs.pop_front().into()
    }
    fn write(&mut self, value: i64) {
        self.outputs.push(value)
    }
}

/// Reads from a shared channel, so that input can show up while the bus is borrowed.
struct ChannelBus {
    input: Channel,
    outputs: Vec<i64>,
}
impl IntcodeBus for ChannelBus {
    fn read(&mut self) -> Input {
        self.input.pop()
    }
    fn write(&mut self, value: i64) {
        self.outputs.push(value)
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_memory_state(program: &[i64], expected_memory: &[i64]) {
    let mut machine = IntcodeMachine::new(program);
    assert_eq!(machine.run(&mut ()), Ok(Status::Halted));
    assert_eq!(machine.memory_image(), expected_memory)
}
fn assert_outputs(program: &[i64], inputs: &[i64], expected_outputs: &[i64]) {
    let mut machine = IntcodeMachine::new(program);
    let mut bus = TestBus::with_inputs(inputs);
    assert_eq!(machine.run(&mut bus), Ok(Status::Halted));
    assert_eq!(bus.outputs, expected_outputs)
}
fn assert_fault(program: &[i64], expected_fault: IntcodeFault) {
    let mut machine = IntcodeMachine::new(program);
    assert_eq!(machine.run(&mut ()), Err(expected_fault));
    assert_eq!(machine.fault(), Some(expected_fault));
}

const QUINE: &[i64] = &[
    109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
];

#[test]
fn test_add_and_multiply() {
    assert_memory_state(&[1, 0, 0, 0, 99], &[2, 0, 0, 0, 99]);
    assert_memory_state(&[2, 3, 0, 3, 99], &[2, 3, 0, 6, 99]);
    assert_memory_state(&[2, 4, 4, 5, 99, 0], &[2, 4, 4, 5, 99, 9801]);
    assert_memory_state(
        &[1, 1, 1, 4, 99, 5, 6, 0, 99],
        &[30, 1, 1, 4, 2, 5, 6, 0, 99],
    );
    assert_memory_state(
        &[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50],
        &[3500, 9, 10, 70, 2, 3, 11, 0, 99, 30, 40, 50],
    );
}

#[test]
fn test_parameter_modes() {
    assert_memory_state(&[1002, 4, 3, 4, 33], &[1002, 4, 3, 4, 99]);
    assert_memory_state(&[1101, 100, -1, 4, 0], &[1101, 100, -1, 4, 99]);
}

#[test]
fn test_input_output() {
    assert_outputs(&[3, 0, 4, 0, 99], &[-34], &[-34]);

    let mut machine = IntcodeMachine::new(&[203, 50]);
    machine.set_relative_base(-10);
    let mut bus = TestBus::with_inputs(&[1]);
    assert!(matches!(machine.step(&mut bus), Ok(Step::Continue(_))));
    assert_eq!(machine.peek_instruction_pointer(), 2);
    assert_eq!(machine.peek_memory(40), 1);
}

#[test]
fn test_comparisons() {
    // Equal to 8, position then immediate mode.
    let equal_position = [3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];
    let equal_immediate = [3, 3, 1108, -1, 8, 3, 4, 3, 99];
    // Less than 8.
    let less_position = [3, 9, 7, 9, 10, 9, 4, 9, 99, -1, 8];
    let less_immediate = [3, 3, 1107, -1, 8, 3, 4, 3, 99];
    for (input, equal, less) in [(7, 0, 1), (8, 1, 0), (9, 0, 0)] {
        assert_outputs(&equal_position, &[input], &[equal]);
        assert_outputs(&equal_immediate, &[input], &[equal]);
        assert_outputs(&less_position, &[input], &[less]);
        assert_outputs(&less_immediate, &[input], &[less]);
    }
}

#[test]
fn test_jumps() {
    // Outputs 0 if the input was zero, 1 otherwise.
    let jump_position = [3, 12, 6, 12, 15, 1, 13, 14, 13, 4, 13, 99, -1, 0, 1, 9];
    let jump_immediate = [3, 3, 1105, -1, 9, 1101, 0, 0, 12, 4, 12, 99, 1];
    for (input, expected) in [(0, 0), (5, 1), (-3, 1)] {
        assert_outputs(&jump_position, &[input], &[expected]);
        assert_outputs(&jump_immediate, &[input], &[expected]);
    }
}

#[test]
fn test_relative_base() {
    let mut machine = IntcodeMachine::new(&[9, 2, 50]);
    assert!(matches!(machine.step(&mut ()), Ok(Step::Continue(_))));
    assert_eq!(machine.peek_instruction_pointer(), 2);
    assert_eq!(machine.peek_relative_base(), 50);

    let mut machine = IntcodeMachine::new(&[109, 50]);
    machine.step(&mut ()).unwrap();
    assert_eq!(machine.peek_instruction_pointer(), 2);
    assert_eq!(machine.peek_relative_base(), 50);

    let mut program = vec![0; 41];
    program[0] = 209;
    program[1] = 50;
    program[40] = 10;
    let mut machine = IntcodeMachine::new(&program);
    machine.set_relative_base(-10);
    machine.step(&mut ()).unwrap();
    assert_eq!(machine.peek_instruction_pointer(), 2);
    assert_eq!(machine.peek_relative_base(), 0);
}

#[test]
fn test_big_numbers() {
    assert_outputs(
        &[1102, 34915192, 34915192, 7, 4, 7, 99, 0],
        &[],
        &[1219070632396864],
    );
    assert_outputs(&[104, 1125899906842624, 99], &[], &[1125899906842624]);
}

#[test]
fn test_quine() {
    init_logger();
    assert_outputs(QUINE, &[], QUINE);
}

#[test]
fn test_quine_on_every_memory() {
    let mut bus = TestBus::default();
    let mut machine = IntcodeMachine::from_memory(QUINE.to_vec());
    machine.run(&mut bus).unwrap();
    assert_eq!(bus.outputs, QUINE);

    let mut bus = TestBus::default();
    let mut machine = IntcodeMachine::from_memory(BTreeMap::<usize, i64>::from_program(QUINE));
    machine.run(&mut bus).unwrap();
    assert_eq!(bus.outputs, QUINE);
}

#[test]
fn test_memory_beyond_program() {
    assert_outputs(&[4, 5000, 99], &[], &[0]);
    assert_outputs(&[1101, 5, 6, 1000, 4, 1000, 99], &[], &[11]);
    assert_outputs(
        &[109, 1_000_000_000_000, 21101, 7, 8, 0, 204, 0, 99],
        &[],
        &[15],
    );
}

#[test]
fn test_far_writes_are_peeked() {
    let mut machine = IntcodeMachine::new(&[1101, 5, 6, 1_000_000_000_000, 99]);
    assert_eq!(machine.run(&mut ()), Ok(Status::Halted));
    assert_eq!(machine.peek_memory(1_000_000_000_000), 11);
    assert_eq!(machine.peek_memory(999_999_999_999), 0);
    assert_eq!(machine.memory().extent(), 1_000_000_000_001);
}

#[test]
fn test_self_modifying_code() {
    // Turns the cell at address 4 into an output of address 0.
    assert_outputs(&[1101, 0, 4, 4, 0, 0, 99], &[], &[1101]);
}

#[test]
fn test_faults() {
    assert_fault(
        &[42],
        IntcodeFault::InvalidOpcode {
            address: 0,
            opcode: 42,
        },
    );
    assert_fault(
        &[301, 0, 0, 0, 99],
        IntcodeFault::InvalidMode { address: 0, mode: 3 },
    );
    assert_fault(
        &[11101, 1, 1, 0, 99],
        IntcodeFault::ImmediateWrite { address: 0 },
    );
    assert_fault(&[3, 0, 99], IntcodeFault::MissingInput { address: 0 });
    assert_fault(&[1105, 1, -1], IntcodeFault::OutOfBounds(-1));
    assert_fault(&[1, -1, 0, 0, 99], IntcodeFault::OutOfBounds(-1));
    assert_fault(&[1, 0, 0, 0], IntcodeFault::OutOfBounds(4));
    assert_fault(
        &[1101, i64::MAX, 1, 0, 99],
        IntcodeFault::Overflow { address: 0 },
    );
}

#[test]
fn test_faults_are_sticky() {
    let mut machine = IntcodeMachine::new(&[1101, 1, 1, 0, 42]);
    let fault = IntcodeFault::InvalidOpcode {
        address: 4,
        opcode: 42,
    };
    assert_eq!(machine.run(&mut ()), Err(fault));
    // Fixing the program does not bring the machine back.
    machine.poke_memory(4, 99);
    assert_eq!(machine.step(&mut ()), Err(fault));
    assert_eq!(machine.peek_memory(0), 2);
}

#[test]
fn test_halt_is_final() {
    let mut machine = IntcodeMachine::new(&[99]);
    assert_eq!(machine.step(&mut ()), Ok(Step::Halted));
    assert_eq!(machine.step(&mut ()), Ok(Step::Halted));
    assert!(machine.is_halted());
    assert_eq!(machine.cycles(), 0);
    assert_eq!(machine.peek_instruction_pointer(), 0);
}

#[test]
fn test_suspend_and_resume() {
    let program = [3, 0, 4, 0, 99];
    let mut machine = IntcodeMachine::new(&program);
    let mut bus = TestBus::default();

    assert_eq!(machine.step(&mut bus), Ok(Step::Suspended));
    assert_eq!(machine.run(&mut bus), Ok(Status::Suspended));
    assert_eq!(machine.fault(), None);
    assert_eq!(machine.peek_instruction_pointer(), 0);
    assert_eq!(machine.cycles(), 0);
    assert_eq!(machine.memory_image(), program);

    bus.inputs.push_back(77);
    assert_eq!(machine.run(&mut bus), Ok(Status::Halted));
    assert_eq!(bus.outputs, vec![77]);
}

#[test]
fn test_run_for() {
    let mut machine = IntcodeMachine::new(&[1105, 1, 0]);
    assert_eq!(machine.run_for(&mut (), 10), Ok(Status::Yielded));
    assert_eq!(machine.cycles(), 10);
    assert_eq!(machine.run_for(&mut (), 0), Ok(Status::Yielded));

    let mut machine = IntcodeMachine::new(&[1101, 1, 1, 0, 99]);
    assert_eq!(machine.run_for(&mut (), 10), Ok(Status::Halted));
}

#[test]
fn test_steps() {
    init_logger();
    let mut machine = IntcodeMachine::new(&[1101, 2, 3, 5, 104, 0, 99]);
    let mut bus = TestBus::default();
    let opcodes: Vec<Opcode> = machine
        .steps(&mut bus)
        .map(|instruction| instruction.unwrap().opcode)
        .collect();
    assert_eq!(opcodes, vec![Opcode::Add, Opcode::Output]);
    // The addition patched the output parameter.
    assert_eq!(bus.outputs, vec![5]);

    let mut machine = IntcodeMachine::new(&[104, 1, 42]);
    let mut steps = machine.steps(&mut bus);
    assert!(matches!(steps.next(), Some(Ok(_))));
    assert!(matches!(
        steps.next(),
        Some(Err(IntcodeFault::InvalidOpcode { .. }))
    ));
    assert!(steps.next().is_none());
}

#[test]
fn test_steps_resume_after_suspension() {
    let input = Channel::new();
    let mut bus = ChannelBus {
        input: input.clone(),
        outputs: Vec::new(),
    };
    let mut machine = IntcodeMachine::new(&[3, 0, 4, 0, 99]);

    let mut steps = machine.steps(&mut bus);
    assert!(steps.next().is_none());
    input.push(21);
    let opcodes: Vec<Opcode> = steps
        .map(|instruction| instruction.unwrap().opcode)
        .collect();
    assert_eq!(opcodes, vec![Opcode::Input, Opcode::Output]);
    assert_eq!(bus.outputs, vec![21]);
    assert!(machine.is_halted());
}

/// Sums its inputs until it reads 0, outputting the running total each time.
const RUNNING_SUM: &[i64] = &[
    3, 100, 1006, 100, 14, 1, 100, 101, 101, 4, 101, 1105, 1, 0, 99,
];

proptest! {
    #[test]
    fn suspended_machines_end_up_like_eager_ones(inputs in prop::collection::vec(1i64..1_000_000, 0..16)) {
        let mut script = inputs.clone();
        script.push(0);

        let mut eager = IntcodeMachine::new(RUNNING_SUM);
        let mut eager_bus = TestBus::with_inputs(&script);
        prop_assert_eq!(eager.run(&mut eager_bus), Ok(Status::Halted));

        let mut lazy = IntcodeMachine::new(RUNNING_SUM);
        let mut lazy_bus = TestBus::default();
        for &value in &script {
            prop_assert_eq!(lazy.run(&mut lazy_bus), Ok(Status::Suspended));
            lazy_bus.inputs.push_back(value);
        }
        prop_assert_eq!(lazy.run(&mut lazy_bus), Ok(Status::Halted));

        prop_assert_eq!(&lazy_bus.outputs, &eager_bus.outputs);
        prop_assert_eq!(lazy.memory_image(), eager.memory_image());
        prop_assert_eq!(lazy.cycles(), eager.cycles());

        let expected: Vec<i64> = inputs
            .iter()
            .scan(0, |total, value| {
                *total += value;
                Some(*total)
            })
            .collect();
        prop_assert_eq!(eager_bus.outputs, expected);
    }
}
