use clap::CommandFactory;
use clap_complete::generate_to;
use std::env;
use std::fs;
use std::io::Error;

include!("src/cli.rs");
include!("src/shells.rs");

fn main() -> Result<(), Error> {
    println!("cargo::rustc-check-cfg=cfg(miri)");

    let out_dir =
        std::path::Path::new(&env::var("OUT_DIR").expect("OUT_DIR unset. Expected path."))
            .join("retspec-build-time-out");

    let completion_out_dir = out_dir.join("completions");
    fs::create_dir_all(&completion_out_dir)?;
    let man_out_dir = out_dir.join("man");
    fs::create_dir_all(&man_out_dir)?;

    for (bin_name, mut cmd) in [
        ("retspec-infer", InferCli::command()),
        ("retspec-check", CheckCli::command()),
    ] {
        for shell in Shell::value_variants() {
            generate_to(*shell, &mut cmd, bin_name, &completion_out_dir)?;
        }

        let man = clap_mangen::Man::new(cmd);
        let mut buffer: Vec<u8> = Default::default();
        man.render(&mut buffer)?;
        fs::write(man_out_dir.join(format!("{bin_name}.1")), buffer)?;
    }

    Ok(())
}
