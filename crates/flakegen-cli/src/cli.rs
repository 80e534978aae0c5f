use clap::{Args, Parser, Subcommand, ValueEnum};
use flakegen::{
    BackwardClockPolicy, BitLayout, Decoder, GeneratorSettings, DEFAULT_EPOCH,
    DEFAULT_MAX_DATACENTER_ID, DEFAULT_MAX_SEQUENCE_ID, DEFAULT_MAX_WORKER_ID,
};
use jiff::Timestamp;
use std::fmt::{Display, Formatter};

pub const EPOCH_ENV: &str = "FLAKEGEN_EPOCH";
pub const MAX_SEQUENCE_ID_ENV: &str = "FLAKEGEN_MAX_SEQUENCE_ID";
pub const MAX_WORKER_ID_ENV: &str = "FLAKEGEN_MAX_WORKER_ID";
pub const MAX_DATACENTER_ID_ENV: &str = "FLAKEGEN_MAX_DATACENTER_ID";
pub const WORKER_ID_ENV: &str = "FLAKEGEN_WORKER_ID";
pub const DATACENTER_ID_ENV: &str = "FLAKEGEN_DATACENTER_ID";
pub const CLOCK_POLICY_ENV: &str = "FLAKEGEN_ON_CLOCK_BACKWARD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClockPolicyArg {
    #[value(name = "wait")]
    Wait,
    #[value(name = "reject")]
    Reject,
}

impl Display for ClockPolicyArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockPolicyArg::Wait => write!(f, "wait"),
            ClockPolicyArg::Reject => write!(f, "reject"),
        }
    }
}

impl From<ClockPolicyArg> for BackwardClockPolicy {
    fn from(value: ClockPolicyArg) -> Self {
        match value {
            ClockPolicyArg::Wait => BackwardClockPolicy::Wait,
            ClockPolicyArg::Reject => BackwardClockPolicy::Reject,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "flakegen", version, about = "Generate and decode snowflake ids")]
pub struct CLI {
    #[command(flatten)]
    pub generator: GeneratorArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GeneratorArgs {
    /// Zero point of the timestamp field (RFC 3339).
    #[arg(long, global = true, env = EPOCH_ENV, default_value_t = DEFAULT_EPOCH)]
    pub epoch: Timestamp,

    #[arg(long, global = true, env = MAX_SEQUENCE_ID_ENV, default_value_t = DEFAULT_MAX_SEQUENCE_ID)]
    pub max_sequence_id: u64,

    #[arg(long, global = true, env = MAX_WORKER_ID_ENV, default_value_t = DEFAULT_MAX_WORKER_ID)]
    pub max_worker_id: u64,

    #[arg(
        long,
        global = true,
        env = MAX_DATACENTER_ID_ENV,
        default_value_t = DEFAULT_MAX_DATACENTER_ID
    )]
    pub max_datacenter_id: u64,

    #[arg(long, global = true, env = WORKER_ID_ENV, default_value_t = 0)]
    pub worker_id: u64,

    #[arg(long, global = true, env = DATACENTER_ID_ENV, default_value_t = 0)]
    pub datacenter_id: u64,

    #[arg(
        long,
        global = true,
        env = CLOCK_POLICY_ENV,
        value_enum,
        default_value_t = ClockPolicyArg::Wait
    )]
    pub on_clock_backward: ClockPolicyArg,
}

impl GeneratorArgs {
    pub fn settings(&self) -> GeneratorSettings {
        GeneratorSettings::builder()
            .epoch(self.epoch)
            .max_sequence_id(self.max_sequence_id)
            .max_worker_id(self.max_worker_id)
            .max_datacenter_id(self.max_datacenter_id)
            .worker_id(self.worker_id)
            .datacenter_id(self.datacenter_id)
            .backward_clock_policy(self.on_clock_backward.into())
            .build()
    }

    /// Decoding needs only the epoch and layout, not valid coordinates.
    pub fn decoder(&self) -> Result<Decoder, flakegen::Error> {
        let layout = BitLayout::new(
            self.max_sequence_id,
            self.max_worker_id,
            self.max_datacenter_id,
        )?;
        Ok(Decoder::new(self.epoch, layout))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print new ids, one per line.
    Generate {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Print the fields of each id as a JSON object.
    Decode {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}
