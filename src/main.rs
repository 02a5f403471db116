use clap::{Parser, Subcommand};
use serde::Serialize;

use mifgz::{DataType, ImageDescriptor, ImageFormat, MrtrixGz, SUFFIX};

#[derive(Parser)]
#[command(name = "mifgz", about = "Inspect and create compressed MRtrix images (.mif.gz)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parsed header of an image
    Info {
        input: String,
        /// Emit machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the raw reconstructed header text
    Header {
        input: String,
    },
    /// Create an image with a zero-filled payload
    Create {
        output: String,
        /// Axis sizes, comma-separated (e.g. 128,128,64)
        #[arg(short, long)]
        dim: String,
        /// Voxel spacings, comma-separated (defaults to 1 per axis)
        #[arg(short, long)]
        vox: Option<String>,
        /// Voxel datatype (e.g. Float32LE, UInt16LE, Bit)
        #[arg(long, default_value = "Float32LE")]
        dtype: String,
    },
}

#[derive(Serialize)]
struct FieldReport {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct InfoReport {
    file: String,
    dimensions: Vec<usize>,
    vox: Vec<f32>,
    layout: Vec<i64>,
    datatype: String,
    data_offset: u64,
    fields: Vec<FieldReport>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Commands::Info { input, json } => {
            let (desc, io) = open(&input)?;
            let report = InfoReport {
                file: desc.name().to_owned(),
                dimensions: desc.axes().iter().map(|a| a.size).collect(),
                vox: desc.axes().iter().map(|a| a.spacing).collect(),
                layout: desc.axes().iter().map(|a| a.stride).collect(),
                datatype: desc.dtype().to_string(),
                data_offset: io.data_offset(),
                fields: desc
                    .fields()
                    .iter()
                    .map(|(k, v)| FieldReport {
                        key: k.to_owned(),
                        value: v.to_owned(),
                    })
                    .collect(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("image:       {}", report.file);
                println!("dimensions:  {}", join(report.dimensions.iter()));
                println!("vox:         {}", join(report.vox.iter()));
                println!("datatype:    {}", report.datatype);
                println!("data offset: {}", report.data_offset);
                for f in &report.fields {
                    println!("{}: {}", f.key, f.value);
                }
            }
        }

        Commands::Header { input } => {
            let (_, io) = open(&input)?;
            let text = String::from_utf8_lossy(io.header());
            print!("{}", text.trim_end_matches('\0'));
        }

        Commands::Create { output, dim, vox, dtype } => {
            let sizes: Vec<usize> = dim
                .split(',')
                .map(|s| s.trim().parse())
                .collect::<Result<_, _>>()
                .map_err(|_| format!("invalid --dim \"{dim}\""))?;
            let dtype = DataType::from_name(&dtype)
                .ok_or_else(|| format!("unknown datatype \"{dtype}\""))?;

            let mut desc = ImageDescriptor::new(output.as_str(), &sizes);
            desc.set_dtype(dtype);
            if let Some(vox) = vox {
                let spacings: Vec<f32> = vox
                    .split(',')
                    .map(|s| s.trim().parse())
                    .collect::<Result<_, _>>()
                    .map_err(|_| format!("invalid --vox \"{vox}\""))?;
                for (axis, spacing) in desc.axes_mut().iter_mut().zip(spacings) {
                    axis.spacing = spacing;
                }
            }

            let io = MrtrixGz.create(&desc)?;
            let payload = vec![0u8; dtype.image_bytes(desc.voxel_count()) as usize];
            io.commit(&payload)?;
            println!("created {} (data offset {})", output, io.data_offset());
        }
    }
    Ok(())
}

fn open(input: &str) -> Result<(ImageDescriptor, mifgz::GzImageIo), Box<dyn std::error::Error>> {
    let mut desc = ImageDescriptor::new(input, &[]);
    let io = MrtrixGz
        .read(&mut desc)?
        .ok_or_else(|| format!("\"{input}\" is not a compressed MRtrix image (expected {SUFFIX})"))?;
    Ok((desc, io))
}

fn join<T: ToString, I: Iterator<Item = T>>(items: I) -> String {
    items
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" x ")
}
