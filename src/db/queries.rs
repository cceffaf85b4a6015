use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Booking, BookingStatus, Role, ServiceType, Staff, TimeSlot, User};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ── Users ──

pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub password_hash: &'a str,
    pub password_salt: &'a str,
    pub role: Role,
}

/// A user row together with its stored password digest and salt.
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
    pub password_salt: String,
}

pub fn insert_user(conn: &Connection, user: &NewUser<'_>) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, phone, password_hash, password_salt, role)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.name,
            user.email,
            user.phone,
            user.password_hash,
            user.password_salt,
            user.role.as_str(),
        ],
    )?;
    Ok(())
}

pub fn get_credentials_by_email(
    conn: &Connection,
    email: &str,
) -> anyhow::Result<Option<Credentials>> {
    let creds = conn
        .query_row(
            "SELECT id, name, email, phone, role, password_hash, password_salt
             FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok(Credentials {
                    user: User {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        phone: row.get(3)?,
                        role: Role::parse(&row.get::<_, String>(4)?),
                    },
                    password_hash: row.get(5)?,
                    password_salt: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(creds)
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, email, phone, role FROM users WHERE id = ?1",
            params![id],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

pub fn set_user_role(conn: &Connection, id: &str, role: Role) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), id],
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        role: Role::parse(&row.get::<_, String>(4)?),
    })
}

// ── Sessions ──

pub fn insert_session(
    conn: &Connection,
    token: &str,
    user_id: &str,
    expires_at: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, expires_at.format(DATETIME_FMT).to_string()],
    )?;
    Ok(())
}

pub fn get_session_user(
    conn: &Connection,
    token: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT u.id, u.name, u.email, u.phone, u.role
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1 AND s.expires_at > ?2",
            params![token, now.format(DATETIME_FMT).to_string()],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

pub fn delete_session(conn: &Connection, token: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(count > 0)
}

pub fn delete_expired_sessions(conn: &Connection, now: &NaiveDateTime) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![now.format(DATETIME_FMT).to_string()],
    )?;
    Ok(count)
}

// ── Staff ──

pub fn list_staff(conn: &Connection) -> anyhow::Result<Vec<Staff>> {
    let mut stmt = conn.prepare("SELECT id, name FROM staff ORDER BY position ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Staff {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut staff = vec![];
    for row in rows {
        staff.push(row?);
    }
    Ok(staff)
}

// ── Bookings ──

const BOOKING_SELECT: &str = "SELECT b.id, b.user_id, b.date, b.slot, b.service, b.price_cents, b.staff_id, \
     b.status, b.client_name, b.client_phone, b.created_at, b.updated_at \
     FROM bookings b JOIN staff s ON s.id = b.staff_id";

const BOOKING_ORDER: &str = "ORDER BY b.date ASC, b.slot ASC, s.position ASC";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, date, slot, service, price_cents, staff_id, status, client_name, client_phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.user_id,
            booking.date.format(DATE_FMT).to_string(),
            booking.slot.to_string(),
            booking.service.as_str(),
            booking.price_cents,
            booking.staff_id,
            booking.status.as_str(),
            booking.client_name,
            booking.client_phone,
            booking.created_at.format(DATETIME_FMT).to_string(),
            booking.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("{BOOKING_SELECT} WHERE b.id = ?1");
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    result.transpose()
}

pub fn get_all_bookings(conn: &Connection) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("{BOOKING_SELECT} {BOOKING_ORDER}");
    collect_bookings(conn, &sql, params![])
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("{BOOKING_SELECT} WHERE b.user_id = ?1 {BOOKING_ORDER}");
    collect_bookings(conn, &sql, params![user_id])
}

pub fn get_bookings_on_date(conn: &Connection, date: &NaiveDate) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("{BOOKING_SELECT} WHERE b.date = ?1 {BOOKING_ORDER}");
    collect_bookings(conn, &sql, params![date.format(DATE_FMT).to_string()])
}

pub fn get_bookings_at_slot(
    conn: &Connection,
    date: &NaiveDate,
    slot: &TimeSlot,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("{BOOKING_SELECT} WHERE b.date = ?1 AND b.slot = ?2 {BOOKING_ORDER}");
    collect_bookings(
        conn,
        &sql,
        params![date.format(DATE_FMT).to_string(), slot.to_string()],
    )
}

/// Bookings with `start <= date <= end`.
pub fn get_bookings_in_range(
    conn: &Connection,
    start: &NaiveDate,
    end: &NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("{BOOKING_SELECT} WHERE b.date >= ?1 AND b.date <= ?2 {BOOKING_ORDER}");
    collect_bookings(
        conn,
        &sql,
        params![
            start.format(DATE_FMT).to_string(),
            end.format(DATE_FMT).to_string()
        ],
    )
}

/// Global ledger view for staff, newest appointments first.
pub fn get_recent_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    match status_filter {
        Some(status) => {
            let sql = format!(
                "{BOOKING_SELECT} WHERE b.status = ?1 ORDER BY b.date DESC, b.slot DESC, s.position ASC LIMIT ?2"
            );
            collect_bookings(conn, &sql, params![status.as_str(), limit])
        }
        None => {
            let sql = format!(
                "{BOOKING_SELECT} ORDER BY b.date DESC, b.slot DESC, s.position ASC LIMIT ?1"
            );
            collect_bookings(conn, &sql, params![limit])
        }
    }
}

/// Moves a scheduled booking to `status`. Returns false when no scheduled
/// booking with that id exists.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'scheduled'",
        params![status.as_str(), now.format(DATETIME_FMT).to_string(), id],
    )?;
    Ok(count > 0)
}

fn collect_bookings(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let date_str: String = row.get(2)?;
    let slot_str: String = row.get(3)?;
    let service_str: String = row.get(4)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FMT)
        .with_context(|| format!("booking {id}: bad date {date_str:?}"))?;
    let slot = slot_str
        .parse::<TimeSlot>()
        .with_context(|| format!("booking {id}: bad slot {slot_str:?}"))?;
    let service = service_str
        .parse::<ServiceType>()
        .with_context(|| format!("booking {id}: bad service {service_str:?}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("booking {id}: bad status {status_str:?}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, DATETIME_FMT)
        .with_context(|| format!("booking {id}: bad created_at {created_at_str:?}"))?;
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, DATETIME_FMT)
        .with_context(|| format!("booking {id}: bad updated_at {updated_at_str:?}"))?;

    Ok(Booking {
        id,
        user_id: row.get(1)?,
        date,
        slot,
        service,
        price_cents: row.get(5)?,
        staff_id: row.get(6)?,
        status,
        client_name: row.get(8)?,
        client_phone: row.get(9)?,
        created_at,
        updated_at,
    })
}
