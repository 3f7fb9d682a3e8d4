use clap::Parser;
use env_logger::Env;
use log::error;

use imlayout::Opts;
use imlayout::cli::SubCommandExtend;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();
    // 阶段失败只记录日志，退出码仍为 0
    if let Err(e) = opts.subcmd.run(&opts) {
        error!("{:#}", e);
    }
}
