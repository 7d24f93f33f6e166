use clap::Args;

use crate::cnf::{PKG_NAME, PKG_VERSION};
use crate::err::Error;

#[derive(Args, Debug)]
pub struct VersionCommandArguments {}

pub async fn init(_: VersionCommandArguments) -> Result<(), Error> {
	println!("{}", version());
	Ok(())
}

fn version() -> String {
	format!("{PKG_NAME} {PKG_VERSION} for {} on {}", std::env::consts::OS, std::env::consts::ARCH)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_the_platform() {
		let v = version();
		assert!(v.starts_with("formgraph "));
		assert!(v.ends_with(std::env::consts::ARCH));
	}
}
