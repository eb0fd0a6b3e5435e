//! Raw record tables: inserts for loading, filtered reads for the refresh.

use super::RecordStore;
use crate::{
    error::{AnalyticsError, AnalyticsResult},
    source::{RecordSource, Table},
    types::{CommissionRecord, PricingRecord, UsageRecord},
};
use chrono::NaiveDate;
use rusqlite::params;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse the date part of a stored date or datetime string.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

impl RecordStore {
    // ── Usage (esiids) ─────────────────────────────────────────

    pub fn insert_usage(&self, record: &UsageRecord) -> AnalyticsResult<()> {
        self.conn().execute(
            "INSERT INTO esiids (account_name, esi_id, rep, zone, load_profile, kwh_mo, kwh_yr, total_bill)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.account_name,
                record.esiid,
                record.provider,
                record.zone,
                record.load_profile,
                record.monthly_kwh,
                record.annual_kwh,
                record.total_bill,
            ],
        )?;
        Ok(())
    }

    fn usage_rows(&self) -> rusqlite::Result<Vec<UsageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT account_name, esi_id, rep, zone, load_profile, kwh_mo, kwh_yr, total_bill
             FROM esiids
             WHERE kwh_mo IS NOT NULL AND kwh_mo > 0
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UsageRecord {
                account_name: row.get(0)?,
                esiid:        row.get(1)?,
                provider:     row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                zone:         row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                load_profile: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                monthly_kwh:  row.get(5)?,
                annual_kwh:   row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
                total_bill:   row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
            })
        })?;
        rows.collect()
    }

    // ── Pricing (daily_pricing) ────────────────────────────────

    pub fn insert_pricing(&self, record: &PricingRecord) -> AnalyticsResult<()> {
        self.conn().execute(
            "INSERT INTO daily_pricing (effective_date, zone, rep, load_profile, daily_rate, term_months)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.effective_date.format(DATE_FORMAT).to_string(),
                record.zone,
                record.provider,
                record.load_profile,
                record.daily_rate,
                record.term_months,
            ],
        )?;
        Ok(())
    }

    fn pricing_rows(&self) -> rusqlite::Result<Vec<PricingRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT effective_date, zone, rep, load_profile, daily_rate, term_months
             FROM daily_pricing
             WHERE daily_rate IS NOT NULL AND daily_rate > 0
             ORDER BY effective_date ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let raw_date: String = row.get(0)?;
            Ok((
                raw_date,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                row.get::<_, f64>(4)?,
                row.get::<_, Option<u32>>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (raw_date, zone, provider, load_profile, daily_rate, term_months) = row?;
            match parse_date(&raw_date) {
                Some(effective_date) => records.push(PricingRecord {
                    effective_date,
                    zone,
                    provider,
                    load_profile,
                    daily_rate,
                    term_months,
                }),
                None => log::warn!("pricing: skipping row with unparseable date '{raw_date}'"),
            }
        }
        Ok(records)
    }

    // ── Commissions ────────────────────────────────────────────

    pub fn insert_commission(&self, record: &CommissionRecord) -> AnalyticsResult<()> {
        self.conn().execute(
            "INSERT INTO commissions (account_name, k_rep, commission_type, actual_payment_amount, actual_payment_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.account_name,
                record.provider,
                record.commission_type,
                record.payment_amount,
                record.payment_date.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    fn commission_rows(&self) -> rusqlite::Result<Vec<CommissionRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT account_name, k_rep, commission_type, actual_payment_amount, actual_payment_date
             FROM commissions
             WHERE actual_payment_amount IS NOT NULL AND actual_payment_date IS NOT NULL
             ORDER BY actual_payment_date ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (account_name, provider, commission_type, payment_amount, raw_date) = row?;
            match parse_date(&raw_date) {
                Some(payment_date) => records.push(CommissionRecord {
                    account_name,
                    provider,
                    commission_type,
                    payment_amount,
                    payment_date,
                }),
                None => log::warn!("commission: skipping row with unparseable date '{raw_date}'"),
            }
        }
        Ok(records)
    }

    // ── Test / summary helpers ─────────────────────────────────

    /// Row counts for (esiids, daily_pricing, commissions), unfiltered.
    pub fn table_counts(&self) -> AnalyticsResult<(i64, i64, i64)> {
        let conn = self.conn();
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        };
        Ok((count("esiids")?, count("daily_pricing")?, count("commissions")?))
    }
}

fn read_failure(table: Table) -> impl FnOnce(rusqlite::Error) -> AnalyticsError {
    move |e| AnalyticsError::source_read(table.name(), e)
}

impl RecordSource for RecordStore {
    fn read_usage(&self) -> AnalyticsResult<Vec<UsageRecord>> {
        self.usage_rows().map_err(read_failure(Table::Usage))
    }

    fn read_pricing(&self) -> AnalyticsResult<Vec<PricingRecord>> {
        self.pricing_rows().map_err(read_failure(Table::Pricing))
    }

    fn read_commissions(&self) -> AnalyticsResult<Vec<CommissionRecord>> {
        self.commission_rows().map_err(read_failure(Table::Commissions))
    }
}
