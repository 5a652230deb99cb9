use rusqlite::{params, Connection};

use crate::models::Patient;

const PATIENT_COLUMNS: &str =
    "patient_id, first_name, last_name, dob, phone, email, insurance, provider";

// ── Patients ──

/// Case-insensitive substring search over id, names, full name, phone and email.
pub fn search_patients(conn: &Connection, query: &str, limit: i64) -> anyhow::Result<Vec<Patient>> {
    let pattern = format!("%{}%", escape_like(&query.trim().to_lowercase()));

    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE lower(patient_id) LIKE ?1 ESCAPE '\\'
            OR lower(first_name) LIKE ?1 ESCAPE '\\'
            OR lower(last_name) LIKE ?1 ESCAPE '\\'
            OR lower(first_name || ' ' || last_name) LIKE ?1 ESCAPE '\\'
            OR phone LIKE ?1 ESCAPE '\\'
            OR lower(email) LIKE ?1 ESCAPE '\\'
         ORDER BY rowid ASC
         LIMIT ?2"
    ))?;

    let rows = stmt.query_map(params![pattern, limit], parse_patient_row)?;

    let mut patients = vec![];
    for row in rows {
        patients.push(row?);
    }
    Ok(patients)
}

pub fn get_patient_by_id(conn: &Connection, patient_id: &str) -> anyhow::Result<Option<Patient>> {
    let result = conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE upper(patient_id) = ?1"),
        params![patient_id.trim().to_uppercase()],
        parse_patient_row,
    );

    match result {
        Ok(patient) => Ok(Some(patient)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> anyhow::Result<()> {
    conn.execute(
        &format!("INSERT INTO patients ({PATIENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            patient.patient_id,
            patient.first_name,
            patient.last_name,
            patient.dob,
            patient.phone,
            patient.email,
            patient.insurance,
            patient.provider,
        ],
    )?;
    Ok(())
}

fn parse_patient_row(row: &rusqlite::Row) -> rusqlite::Result<Patient> {
    Ok(Patient {
        patient_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        dob: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        insurance: row.get(6)?,
        provider: row.get(7)?,
    })
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
