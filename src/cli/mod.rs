mod color;
mod convert;
mod grid;
mod pca;
mod run;
mod tsne;

pub use color::*;
pub use convert::*;
pub use grid::*;
pub use pca::*;
pub use run::*;
pub use tsne::*;

use crate::config::{Opts, SubCommand};

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> anyhow::Result<()>;
}

impl SubCommandExtend for SubCommand {
    fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        match self {
            SubCommand::Color(cmd) => cmd.run(opts),
            SubCommand::Pca(cmd) => cmd.run(opts),
            SubCommand::Tsne(cmd) => cmd.run(opts),
            SubCommand::Grid(cmd) => cmd.run(opts),
            SubCommand::Csv2json(cmd) => cmd.run(opts),
            SubCommand::Run(cmd) => cmd.run(opts),
        }
    }
}
