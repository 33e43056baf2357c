//! # Intcode networks
//! Several [`IntcodeComputer`]s wired output to input, scheduled cooperatively on the
//! current thread.
//!
//! Scheduling is round robin: each runnable computer gets to execute up to `quantum`
//! instructions, or less if it halts or waits for input. Waiting computers are simply
//! tried again on their next turn. When a computer halts, the channel it was feeding
//! gets closed, so that its reader faults instead of waiting forever.
//!
//! Amplifier series and feedback loops come built in:
//! ```rust
//! # use intcode::network::Network;
//! let program = [
//!     3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1,
//!     28, 1005, 28, 6, 99, 0, 0, 5,
//! ];
//! let signal = Network::amplify(&program, &[9, 8, 7, 6, 5], 0, true).unwrap();
//! assert_eq!(signal, 139629729);
//! ```

use std::{collections::VecDeque, fmt::Display};

use log::{debug, warn};
use thiserror::Error;

use crate::{
    channel::OutputSink,
    computer::IntcodeComputer,
    machine::{IntcodeFault, Status},
};

/// Handle to a computer of a [`Network`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);
impl Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("node {node} faulted: {fault}")]
    Fault {
        node: NodeId,
        #[source]
        fault: IntcodeFault,
    },
    #[error("every remaining node is waiting for input: {waiting:?}")]
    Deadlock { waiting: Vec<NodeId> },
    #[error("the last node never produced any output")]
    NoSignal,
}

/// Default number of instructions a computer runs before letting the next one go.
pub const DEFAULT_QUANTUM: usize = 1024;

#[derive(Debug)]
pub struct Network {
    nodes: Vec<IntcodeComputer>,
    quantum: usize,
}
impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
impl Network {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            quantum: DEFAULT_QUANTUM,
        }
    }
    /// Sets how many instructions each computer executes per turn, at least one.
    pub fn with_quantum(mut self, quantum: usize) -> Self {
        self.quantum = quantum.max(1);
        self
    }

    pub fn add(&mut self, computer: IntcodeComputer) -> NodeId {
        self.nodes.push(computer);
        NodeId(self.nodes.len() - 1)
    }
    /// Forwards every output of `from` to the input of `to`.
    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        let channel = self.nodes[to.0].input_channel();
        self.nodes[from.0].set_output_sink(OutputSink::Chained(channel));
    }

    pub fn node(&self, id: NodeId) -> &IntcodeComputer {
        &self.nodes[id.0]
    }
    pub fn node_mut(&mut self, id: NodeId) -> &mut IntcodeComputer {
        &mut self.nodes[id.0]
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn is_halted(&self) -> bool {
        self.nodes.iter().all(IntcodeComputer::is_halted)
    }
    /// Nodes that have not halted yet.
    pub fn waiting(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|&id| !self.node(id).is_halted())
            .collect()
    }

    /// Runs every computer until all of them halted, or all remaining ones wait for
    /// input no other computer is going to provide.
    ///
    /// In the latter case [`Status::Suspended`] is returned, and the network can be run
    /// again once the host provided more input.
    pub fn run(&mut self) -> Result<Status, NetworkError> {
        let mut queue: VecDeque<NodeId> = self.waiting().into();
        // Consecutive turns in which nothing got executed.
        let mut idle_turns = 0;

        while let Some(id) = queue.pop_front() {
            let node = &mut self.nodes[id.0];
            let cycles = node.cycles();
            let status = node.run_for(self.quantum).map_err(|fault| {
                warn!("node {id} faulted: {fault}");
                NetworkError::Fault { node: id, fault }
            })?;

            match status {
                Status::Halted => {
                    debug!("node {id} halted after {} cycles", node.cycles());
                    if let OutputSink::Chained(channel) = node.output_sink() {
                        channel.close()
                    }
                    idle_turns = 0;
                }
                Status::Suspended | Status::Yielded => {
                    if node.cycles() == cycles {
                        idle_turns += 1
                    } else {
                        idle_turns = 0
                    }
                    queue.push_back(id);
                    if idle_turns >= queue.len() {
                        debug!("every node is waiting for input: {queue:?}");
                        return Ok(Status::Suspended);
                    }
                }
            }
        }

        Ok(Status::Halted)
    }

    /// Computers running `program`, each first fed its phase setting, wired in series.
    /// The last one keeps its output buffered.
    pub fn chain(program: &[i64], phases: &[i64]) -> Self {
        let mut network = Self::new();
        let ids: Vec<NodeId> = phases
            .iter()
            .map(|&phase| {
                let mut computer = IntcodeComputer::new(program);
                computer.provide_input(phase);
                network.add(computer)
            })
            .collect();
        for pair in ids.windows(2) {
            network.connect(pair[0], pair[1])
        }
        network
    }

    /// Same as [`Network::chain`], with the last computer feeding the first one.
    /// A single computer feeds itself.
    pub fn ring(program: &[i64], phases: &[i64]) -> Self {
        let mut network = Self::chain(program, phases);
        if !network.is_empty() {
            network.connect(NodeId(network.len() - 1), NodeId(0));
        }
        network
    }

    /// Sends `signal` through amplifiers running `program` with the given phase
    /// settings, in series or in a feedback loop, and returns the last signal emitted
    /// by the last amplifier.
    pub fn amplify(
        program: &[i64],
        phases: &[i64],
        signal: i64,
        feedback: bool,
    ) -> Result<i64, NetworkError> {
        let mut network = if feedback {
            Self::ring(program, phases)
        } else {
            Self::chain(program, phases)
        };
        if network.is_empty() {
            return Err(NetworkError::NoSignal);
        }

        network.node_mut(NodeId(0)).provide_input(signal);
        if network.run()? == Status::Suspended {
            return Err(NetworkError::Deadlock {
                waiting: network.waiting(),
            });
        }
        network
            .node(NodeId(network.len() - 1))
            .last_output()
            .ok_or(NetworkError::NoSignal)
    }
}
