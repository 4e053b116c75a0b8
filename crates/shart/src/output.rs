use std::io::{self, IsTerminal, Stdout, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use shart::driver::PacketSink;
use shart::frame::Frame;
use shart::imu::ImuReading;
use shart::schema::{DecodedPacket, FieldValue, PacketRegistry, SENSOR};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Csv,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput<'a> {
    tag: u8,
    name: &'a str,
    fields: &'a [FieldValue],
    #[serde(skip_serializing_if = "Option::is_none")]
    imu: Option<ImuReading>,
}

enum Target<W: Write> {
    Plain(W),
    Csv(csv::Writer<W>),
}

/// Prints each decoded packet in the selected output format.
pub struct PacketPrinter<W: Write> {
    format: OutputFormat,
    imu: bool,
    target: Target<W>,
}

impl PacketPrinter<Stdout> {
    pub fn stdout(format: OutputFormat, imu: bool) -> Self {
        Self::new(io::stdout(), format, imu)
    }
}

impl<W: Write> PacketPrinter<W> {
    pub fn new(out: W, format: OutputFormat, imu: bool) -> Self {
        let target = match format {
            // Rows differ in width between packet types.
            OutputFormat::Csv => Target::Csv(
                csv::WriterBuilder::new()
                    .flexible(true)
                    .has_headers(false)
                    .from_writer(out),
            ),
            _ => Target::Plain(out),
        };
        Self {
            format,
            imu,
            target,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> io::Result<W> {
        match self.target {
            Target::Plain(out) => Ok(out),
            Target::Csv(writer) => writer.into_inner().map_err(|err| err.into_error()),
        }
    }

    fn imu_for(&self, packet: &DecodedPacket) -> Option<ImuReading> {
        if self.imu && packet.tag == SENSOR {
            ImuReading::from_packet(packet)
        } else {
            None
        }
    }
}

impl<W: Write> PacketSink for PacketPrinter<W> {
    fn accept(&mut self, name: &str, frame: &Frame, packet: &DecodedPacket) -> io::Result<()> {
        let imu = self.imu_for(packet);

        match (&mut self.target, self.format) {
            (Target::Csv(writer), _) => {
                let mut record = vec![name.to_string(), format!("{:#04x}", packet.tag)];
                record.extend(packet.fields.iter().map(ToString::to_string));
                if let Some(imu) = imu {
                    record.extend(imu.accel.iter().chain(&imu.gyro).map(|v| format!("{v:.6}")));
                }
                writer.write_record(&record)?;
                writer.flush()
            }
            (Target::Plain(out), OutputFormat::Json) => {
                let line = PacketOutput {
                    tag: packet.tag,
                    name,
                    fields: &packet.fields,
                    imu,
                };
                serde_json::to_writer(&mut *out, &line)?;
                writeln!(out)?;
                out.flush()
            }
            (Target::Plain(out), OutputFormat::Table) => {
                writeln!(out, "{}", packet_table(name, packet, imu.as_ref()))?;
                out.flush()
            }
            (Target::Plain(out), OutputFormat::Raw) => {
                out.write_all(&frame.payload)?;
                out.flush()
            }
            (Target::Plain(out), _) => {
                writeln!(out, "{}", pretty_line(name, packet, imu.as_ref()))?;
                out.flush()
            }
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        match &mut self.target {
            Target::Plain(out) => out.flush(),
            Target::Csv(writer) => writer.flush(),
        }
    }
}

fn join_fields(fields: &[FieldValue]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_axes(axes: &[f64; 3]) -> String {
    format!("{:.4}, {:.4}, {:.4}", axes[0], axes[1], axes[2])
}

fn pretty_line(name: &str, packet: &DecodedPacket, imu: Option<&ImuReading>) -> String {
    let mut line = format!(
        "[{}] ({})",
        name.to_ascii_uppercase(),
        join_fields(&packet.fields)
    );
    if let Some(imu) = imu {
        line.push_str(&format!(
            " accel=({}) m/s^2 gyro=({}) rad/s",
            join_axes(&imu.accel),
            join_axes(&imu.gyro)
        ));
    }
    line
}

fn packet_table(name: &str, packet: &DecodedPacket, imu: Option<&ImuReading>) -> Table {
    let mut header = vec!["TAG", "NAME", "FIELDS"];
    let mut row = vec![
        format!("{:#04x}", packet.tag),
        name.to_string(),
        join_fields(&packet.fields),
    ];
    if let Some(imu) = imu {
        header.extend(["ACCEL (m/s^2)", "GYRO (rad/s)"]);
        row.extend([join_axes(&imu.accel), join_axes(&imu.gyro)]);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header)
        .add_row(row);
    table
}

#[derive(Serialize)]
struct RegistryOutput {
    packets: Vec<LayoutOutput>,
}

#[derive(Serialize)]
struct LayoutOutput {
    tag: String,
    name: String,
    payload_length: usize,
    format: String,
}

fn layouts(registry: &PacketRegistry) -> Vec<LayoutOutput> {
    registry
        .tags()
        .into_iter()
        .filter_map(|tag| {
            let spec = registry.lookup(tag)?;
            Some(LayoutOutput {
                tag: format!("{tag:#04x}"),
                name: registry.name(tag).unwrap_or_default().to_string(),
                payload_length: spec.payload_length(),
                format: spec.format(),
            })
        })
        .collect()
}

/// Print the registry. The JSON form is itself a loadable registry file.
pub fn write_registry(
    out: &mut impl Write,
    registry: &PacketRegistry,
    source: &str,
    format: OutputFormat,
) -> io::Result<()> {
    let packets = layouts(registry);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &RegistryOutput { packets })?;
            writeln!(out)?;
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TAG", "NAME", "LENGTH", "LAYOUT"]);
            for layout in &packets {
                table.add_row(vec![
                    layout.tag.clone(),
                    layout.name.clone(),
                    layout.payload_length.to_string(),
                    layout.format.clone(),
                ]);
            }
            writeln!(out, "layouts from {source}")?;
            writeln!(out, "{table}")?;
        }
        OutputFormat::Pretty => {
            writeln!(out, "layouts from {source}\n")?;
            for layout in &packets {
                writeln!(
                    out,
                    "  {}  {:<10} {:>4} bytes  {}",
                    layout.tag, layout.name, layout.payload_length, layout.format
                )?;
            }
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut *out);
            writer.write_record(["tag", "name", "payload_length", "format"])?;
            for layout in &packets {
                writer.write_record([
                    layout.tag.as_str(),
                    layout.name.as_str(),
                    layout.payload_length.to_string().as_str(),
                    layout.format.as_str(),
                ])?;
            }
            writer.flush()?;
        }
        OutputFormat::Raw => {
            for layout in &packets {
                writeln!(out, "{}", layout.format)?;
            }
        }
    }

    out.flush()
}
