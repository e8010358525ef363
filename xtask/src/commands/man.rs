use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

#[derive(Args, Debug)]
pub struct ManArgs {
    /// Output directory (default: dist/share/man/man1)
    #[arg(long = "out-dir", default_value = "dist/share/man/man1")]
    pub out_dir: PathBuf,
}

pub fn cmd_man(args: ManArgs) -> Result<(), String> {
    let out_dir = crate::workspace_root().join(args.out_dir);
    fs::create_dir_all(&out_dir).map_err(|e| format!("{}: {e}", out_dir.display()))?;

    let cmd = bumpgate::command();
    render_page(&cmd, &out_dir.join(format!("{}.1", crate::BIN_NAME)))?;

    // bumpgate-preflight.1, bumpgate-bump.1, ...
    for subcommand in cmd.get_subcommands() {
        let page = format!("{}-{}.1", crate::BIN_NAME, subcommand.get_name());
        render_page(subcommand, &out_dir.join(page))?;
    }

    Ok(())
}

fn render_page(cmd: &clap::Command, path: &Path) -> Result<(), String> {
    let mut buffer: Vec<u8> = Vec::new();
    clap_mangen::Man::new(cmd.clone())
        .render(&mut buffer)
        .map_err(|e| format!("render manpage for {}: {e}", cmd.get_name()))?;
    fs::write(path, buffer).map_err(|e| format!("{}: {e}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
