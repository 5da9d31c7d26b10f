use std::fs;
use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};
use flash_eeprom_tool::{
    inspect_image,
    VariableSet,
};

#[derive(Parser)]
#[command(name = "flash-eeprom-tool")]
#[command(about = "flash-eeprom image generator, parser and inspector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image from a CSV file of `address,value` rows
    Generate {
        /// Input CSV file path
        input: PathBuf,

        /// Output image file path
        output: PathBuf,

        /// Size of one page in bytes (must be multiple of 1024), the image holds two pages
        #[arg(short, long, value_parser = parse_size, default_value = "16384")]
        page_size: usize,
    },
    /// Recover an image and write its variables to a CSV file
    Parse {
        /// Input image file path
        input: PathBuf,

        /// Output CSV file path
        output: PathBuf,
    },
    /// Dump page headers and every used slot of an image
    Inspect {
        /// Input image file path
        input: PathBuf,
    },
}

fn parse_size(s: &str) -> Result<usize, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<usize>().map_err(|e| e.to_string())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            output,
            page_size,
        } => {
            println!("Parsing CSV file: {}", input.display());
            let variables = VariableSet::from_csv_file(&input)?;
            println!("Found {} variables", variables.variables.len());

            println!("Generating image...");
            variables.generate_image_file(&output, page_size)?;

            println!("Successfully generated image: {}", output.display());
            println!("Size: {} bytes (2 pages of {} bytes)", 2 * page_size, page_size);

            Ok(())
        }
        Commands::Parse { input, output } => {
            println!("Parsing image file: {}", input.display());
            let variables = VariableSet::parse_image_file(&input)?;
            println!("Found {} variables", variables.variables.len());

            println!("Writing CSV file...");
            variables.to_csv_file(&output)?;

            println!("Successfully parsed image to: {}", output.display());

            Ok(())
        }
        Commands::Inspect { input } => {
            let data = fs::read(&input)?;
            let report = inspect_image(&data)?;

            println!("{}: 2 pages of {} bytes", input.display(), report.page_size);
            print!("{report}");

            Ok(())
        }
    }
}
