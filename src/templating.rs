//! Minijinja rendering of the KGB reminder message.
//!
//! Templates see the roster columns under `fields.*` (see
//! [`Column::key`](crate::domain::Column::key)) plus the formatted event dates.

use crate::constants::{MESSAGE_DATE_FORMAT, ROSTER_DATE_FORMAT};
use crate::domain::{NotificationEvent, RosterRecord};
use crate::error::DispatchError;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_TEMPLATE: &str = r#"🔔 *NOTIFIKASI KENAIKAN GAJI BERKALA* 🔔
━━━━━━━━━━━━━━━━━━━━━

👤 *INFORMASI PEGAWAI*
📝 Nomor: {{ fields.no }}
👨‍💼 Nama: *{{ nama }}*
🆔 NIP: *{{ nip }}*
📊 Pangkat/Gol: *{{ fields.pangkat }}/{{ fields.gol }}*

📅 *INFORMASI KGB*
• TMT Lama: *{{ tmt_lama }}*
• Gaji Pokok Lama: *Rp{{ fields.gaji_pokok_lama }}*
• Masa Kerja Lama: *{{ fields.masa_kerja_lama }}*

📈 *KENAIKAN GAJI BERKALA*
• TMT Baru: *{{ tmt_baru }}*
• Gaji Pokok Baru: *Rp{{ fields.gaji_pokok_baru }}*
• Masa Kerja Baru: *{{ fields.masa_kerja_baru }}*

📋 *INFORMASI SURAT*
• Nomor: *{{ fields.nomor_srt }}*
• Tanggal: *{{ fields.tanggal_srt }}*
• Pejabat: *{{ fields.oleh_pejabat }}*

🏢 *UNIT KERJA*
• Satker: *{{ fields.satker }}*
• Lokasi: *{{ fields.di }}*

⚠️ _Mohon segera mempersiapkan berkas-berkas yang diperlukan._
⚠️ _Jangan lupa untuk memperbarui data pegawai di https://s.id/D3gqN juga_
━━━━━━━━━━━━━━━━━━━━━
"#;

/// Context data available to message templates.
#[derive(Debug, Clone, Serialize)]
pub struct MessageContext<'a> {
    pub nip: &'a str,
    pub nama: &'a str,
    /// Old effective date, e.g. `15 March 2023`.
    pub tmt_lama: String,
    /// Event date, e.g. `15 March 2025`.
    pub tmt_baru: String,
    /// Same dates in roster notation (`15-03-2025`).
    pub tmt_lama_short: String,
    pub tmt_baru_short: String,
    pub fields: &'a BTreeMap<String, String>,
}

impl<'a> MessageContext<'a> {
    pub fn new(record: &'a RosterRecord, event: &NotificationEvent) -> Self {
        Self {
            nip: &record.nip,
            nama: &record.name,
            tmt_lama: event.base_date.format(MESSAGE_DATE_FORMAT).to_string(),
            tmt_baru: event.derived_date.format(MESSAGE_DATE_FORMAT).to_string(),
            tmt_lama_short: event.base_date.format(ROSTER_DATE_FORMAT).to_string(),
            tmt_baru_short: event.derived_date.format(ROSTER_DATE_FORMAT).to_string(),
            fields: &record.fields,
        }
    }
}

/// Renders message templates using minijinja.
///
/// The template is a single arbitrary string rather than a registered set, so
/// a fresh [`minijinja::Environment`] is created per render call. It is parsed
/// once at construction so a broken override file is reported at startup
/// rather than on the first eligible employee.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template: String,
}

impl TemplateRenderer {
    pub fn new(template: impl Into<String>) -> Result<Self, DispatchError> {
        let template = template.into();
        minijinja::Environment::new()
            .template_from_str(&template)
            .map_err(|e| DispatchError::Template(e.to_string()))?;
        Ok(Self { template })
    }

    pub fn render(&self, ctx: &MessageContext<'_>) -> Result<String, DispatchError> {
        minijinja::Environment::new()
            .render_str(&self.template, ctx)
            .map_err(|e| DispatchError::Template(e.to_string()))
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}
