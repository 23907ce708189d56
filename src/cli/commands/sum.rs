//! Sum command - print a lockfile fingerprint

use crate::cli::args::SumArgs;
use crate::error::ModlayerResult;
use crate::fingerprint::Summer;

/// Execute the sum command
pub async fn execute(args: SumArgs) -> ModlayerResult<()> {
    let fingerprint = Summer::new().sum(&args.path)?;
    println!("{}", fingerprint);
    Ok(())
}
