//! Tracker board logic: the CCNA topic seed, progress, filtering, moves and
//! the CSV/JSON interchange formats used by the export buttons.
//!
//! Everything here is synchronous and operates on an in-memory [`Board`];
//! persistence lives in [`crate::storage`].

use std::collections::BTreeMap;

use serde_json::Value;
use ulid::Ulid;

use crate::error::{ServiceError, ServiceResult};
use crate::types::{Board, ColumnId, ColumnProgress, Task, TaskPatch, default_columns};

const SEED: &[(ColumnId, &[(&str, &str)])] = &[
    (
        ColumnId::Basic,
        &[
            ("b1", "Navigating User Levels"),
            ("b2", "Hostname"),
            ("b3", "Banner motd/message"),
            ("b4", "Enable Password"),
            ("b5", "Line console password"),
            ("b6", "Line VTY password"),
            ("b7", "Exec timeout"),
            ("b8", "Logging Synchronous"),
            ("b9", "Disabling IP domain lookup"),
            ("b10", "IP domain name"),
            ("b11", "Username and password"),
            ("b12", "Encrypting all passwords"),
            ("b13", "Set Current Clock Time"),
            ("b14", "Set management IP Address - SW"),
            ("b15", "Prevent Brute-force Attack - Router"),
        ],
    ),
    (
        ColumnId::Switching,
        &[
            ("s1", "VLANs"),
            ("s2", "VLAN Trunking Protocol (VTP)"),
            ("s3", "Trunk - Allowed/Denied VLANs"),
            ("s4", "Configure Native VLAN"),
            ("s5", "Remote Access - Telnet"),
            ("s6", "Remote Access - SSH"),
            ("s7", "L2 EtherChannel - PAGP/LACP"),
            ("s8", "L2 EtherChannel - ON Mode"),
            ("s9", "Secure All Unused Switchports"),
            ("s10", "STP Attack Prevention"),
            ("s11", "Disable CDP on the Devices"),
            ("s12", "VLAN Hopping Attack Prevention"),
            ("s13", "DHCP Snooping"),
            ("s14", "Dynamic ARP Inspection"),
            ("s15", "IP Source Guard"),
        ],
    ),
    (
        ColumnId::Routing,
        &[
            ("r1", "Multilayer Switch + L3 EtherChannel"),
            ("r2", "Connecting Multiple Networks"),
            ("r3", "Remote Access - Telnet & SSH"),
            ("r4", "Inter-VLAN Routing - Router & L3 Switch"),
            ("r5", "DHCP Server - Router & L3 Switch"),
            ("r6", "Inter-VLAN + DHCP - Router & L3 Switch"),
            ("r7", "DHCP, DNS, Web, Email, FTP Servers"),
            ("r8", "DHCP Relay Agent - Router & L3 Switch"),
            ("r9", "Static, Floating & Default Routing"),
            ("r10", "RIP, EIGRP, OSPF & BGP Routing"),
            ("r11", "ACLs - Standard & Extended"),
            ("r12", "ACLs for VTY - Remote Access"),
            ("r13", "NAT - Static, Dynamic & PAT"),
            ("r14", "Normal HSRP, HSRP with VLANs"),
            ("r15", "IPv6 Configs + SLAAC"),
            ("r16", "Static Routing for IPv6"),
            ("r17", "RIPng for IPv6 Routing"),
            ("r18", "EIGRP for IPv6 Routing"),
            ("r19", "OSPF for IPv6 Routing"),
            ("r20", "WAN PPP - CHAP"),
        ],
    ),
    (
        ColumnId::Wlan,
        &[
            ("w1", "Wireless APs Configs"),
            ("w2", "Wireless LAN Controller (WLC)"),
            ("w3", "VoIP Device Selection"),
            ("w4", "VoIP DHCP Configs"),
            ("w5", "VoIP Phones Configs"),
            ("w6", "VoIP - Data & Voice VLANs"),
            ("w7", "Routing for VoIP - Dial-Peering"),
        ],
    ),
    (
        ColumnId::Asa,
        &[
            ("a1", "Basic Firewall Configs"),
            ("a2", "Interface Security Levels"),
            ("a3", "Firewall Policies"),
            ("a4", "Firewall NAT Configs"),
            ("a5", "Firewall ACLs"),
            ("a6", "NAT + Network Objects"),
            ("a7", "Inspection Policies"),
            ("a8", "IPv6"),
        ],
    ),
];

const CSV_HEADER: &str = "column,title,notes,done";

pub fn new_task_id() -> String {
    format!("t{}", Ulid::new().to_string().to_lowercase())
}

fn task_not_found() -> ServiceError {
    ServiceError::NotFound("Task not found.".to_string())
}

impl Board {
    /// Board seeded with the CCNA topic list.
    pub fn seeded() -> Self {
        let data = SEED
            .iter()
            .map(|(col, topics)| {
                let tasks = topics
                    .iter()
                    .map(|(id, title)| Task {
                        id: id.to_string(),
                        title: title.to_string(),
                        notes: String::new(),
                        done: false,
                        starred: false,
                    })
                    .collect();
                (*col, tasks)
            })
            .collect();
        Self {
            columns: default_columns(),
            data,
        }
    }

    pub fn empty() -> Self {
        let mut board = Self {
            columns: default_columns(),
            data: BTreeMap::new(),
        };
        board.normalize();
        board
    }

    /// Every fixed column gets a list and the column metadata is reset to the
    /// canonical set.
    pub fn normalize(&mut self) {
        self.columns = default_columns();
        for col in ColumnId::ALL {
            self.data.entry(col).or_default();
        }
    }

    pub fn tasks(&self, col: ColumnId) -> &[Task] {
        self.data.get(&col).map(Vec::as_slice).unwrap_or(&[])
    }

    fn tasks_mut(&mut self, col: ColumnId) -> &mut Vec<Task> {
        self.data.entry(col).or_default()
    }

    fn task_mut(&mut self, col: ColumnId, id: &str) -> ServiceResult<&mut Task> {
        self.tasks_mut(col)
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(task_not_found)
    }

    pub fn add_task(&mut self, col: ColumnId, title: &str) -> ServiceResult<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::BadRequest("Task title is required.".to_string()));
        }
        let task = Task {
            id: new_task_id(),
            title: title.to_string(),
            notes: String::new(),
            done: false,
            starred: false,
        };
        self.tasks_mut(col).insert(0, task.clone());
        Ok(task)
    }

    pub fn update_task(&mut self, col: ColumnId, id: &str, patch: TaskPatch) -> ServiceResult<Task> {
        let task = self.task_mut(col, id)?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(notes) = patch.notes {
            task.notes = notes;
        }
        if let Some(done) = patch.done {
            task.done = done;
        }
        if let Some(starred) = patch.starred {
            task.starred = starred;
        }
        Ok(task.clone())
    }

    pub fn delete_task(&mut self, col: ColumnId, id: &str) -> ServiceResult<Task> {
        let list = self.tasks_mut(col);
        let pos = list.iter().position(|t| t.id == id).ok_or_else(task_not_found)?;
        Ok(list.remove(pos))
    }

    pub fn toggle_done(&mut self, col: ColumnId, id: &str) -> ServiceResult<Task> {
        let task = self.task_mut(col, id)?;
        task.done = !task.done;
        Ok(task.clone())
    }

    pub fn toggle_star(&mut self, col: ColumnId, id: &str) -> ServiceResult<Task> {
        let task = self.task_mut(col, id)?;
        task.starred = !task.starred;
        Ok(task.clone())
    }

    pub fn bulk_set_done(&mut self, col: ColumnId, done: bool) -> usize {
        let list = self.tasks_mut(col);
        list.iter_mut().for_each(|t| t.done = done);
        list.len()
    }

    /// Drops finished tasks and returns how many were removed.
    pub fn clear_completed(&mut self, col: ColumnId) -> usize {
        let list = self.tasks_mut(col);
        let before = list.len();
        list.retain(|t| !t.done);
        before - list.len()
    }

    pub fn find_column(&self, id: &str) -> Option<ColumnId> {
        self.data
            .iter()
            .find(|(_, tasks)| tasks.iter().any(|t| t.id == id))
            .map(|(col, _)| *col)
    }

    /// Moves a task to `to` at `index` (clamped; appended when absent). The
    /// index is relative to the destination list after the task is taken out.
    pub fn move_task(&mut self, id: &str, to: ColumnId, index: Option<usize>) -> ServiceResult<Task> {
        let from = self.find_column(id).ok_or_else(task_not_found)?;
        let source = self.tasks_mut(from);
        let pos = source.iter().position(|t| t.id == id).ok_or_else(task_not_found)?;
        let task = source.remove(pos);

        let dest = self.tasks_mut(to);
        let at = index.map_or(dest.len(), |i| i.min(dest.len()));
        dest.insert(at, task.clone());
        Ok(task)
    }

    pub fn column_progress(&self, col: ColumnId) -> ColumnProgress {
        let tasks = self.tasks(col);
        let total = tasks.len();
        let done = tasks.iter().filter(|t| t.done).count();
        let percent = if total == 0 {
            0
        } else {
            ((done as f64 / total as f64) * 100.0).round() as u8
        };
        ColumnProgress {
            column: col,
            total,
            done,
            percent,
        }
    }

    pub fn progress(&self) -> Vec<ColumnProgress> {
        ColumnId::ALL
            .into_iter()
            .map(|col| self.column_progress(col))
            .collect()
    }

    /// Case-insensitive substring search over title and notes. An empty query
    /// returns every task.
    pub fn search(&self, query: &str) -> BTreeMap<ColumnId, Vec<Task>> {
        let q = query.trim().to_lowercase();
        ColumnId::ALL
            .into_iter()
            .map(|col| {
                let hits = self
                    .tasks(col)
                    .iter()
                    .filter(|t| {
                        q.is_empty()
                            || t.title.to_lowercase().contains(&q)
                            || t.notes.to_lowercase().contains(&q)
                    })
                    .cloned()
                    .collect();
                (col, hits)
            })
            .collect()
    }

    pub fn to_csv(&self) -> String {
        let mut lines = vec![CSV_HEADER.to_string()];
        for col in ColumnId::ALL {
            for task in self.tasks(col) {
                lines.push(format!(
                    "{},{},{},{}",
                    col.title(),
                    quote(&task.title),
                    quote(&task.notes),
                    if task.done { "1" } else { "0" }
                ));
            }
        }
        lines.join("\n")
    }

    /// Rebuilds a board from CSV. Rows with an unknown column title land in
    /// the first column; rows with fewer than four fields are skipped.
    pub fn from_csv(text: &str) -> ServiceResult<Self> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .collect();
        if rows.len() <= 1 {
            return Err(ServiceError::BadRequest(
                "CSV empty or has no data rows".to_string(),
            ));
        }

        let mut board = Board::empty();
        for row in &rows[1..] {
            let fields = split_csv_row(row);
            if fields.len() < 4 {
                continue;
            }
            let col = ColumnId::from_title(&fields[0]).unwrap_or(ColumnId::ALL[0]);
            board.tasks_mut(col).push(Task {
                id: new_task_id(),
                title: fields[1].clone(),
                notes: fields[2].clone(),
                done: fields[3].trim() == "1",
                starred: false,
            });
        }
        Ok(board)
    }

    /// Parses a JSON export. Only `data` is required; columns are always
    /// reset to the fixed set.
    pub fn from_json(text: &str) -> ServiceResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|_| ServiceError::BadRequest("Unable to parse JSON".to_string()))?;
        Self::from_value(value)
    }

    /// Keys that are not known column ids are ignored. Tasks without an id
    /// get a fresh one; entries that are not task objects are skipped.
    pub fn from_value(value: Value) -> ServiceResult<Self> {
        let Some(Value::Object(data)) = value.get("data") else {
            return Err(ServiceError::BadRequest("Invalid JSON file".to_string()));
        };

        let mut board = Board::empty();
        for (key, tasks) in data {
            let Ok(col) = key.parse::<ColumnId>() else {
                tracing::debug!("import skipped unknown column {key}");
                continue;
            };
            let Value::Array(tasks) = tasks else {
                continue;
            };
            let list = board.tasks_mut(col);
            list.extend(tasks.iter().filter_map(imported_task));
        }
        Ok(board)
    }
}

fn imported_task(raw: &Value) -> Option<Task> {
    let Value::Object(fields) = raw else {
        return None;
    };
    let mut fields = fields.clone();
    let has_id = fields
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    if !has_id {
        fields.insert("id".to_string(), Value::String(new_task_id()));
    }
    serde_json::from_value(Value::Object(fields)).ok()
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn split_csv_row(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = row.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(board: &Board, col: ColumnId) -> Vec<String> {
        board.tasks(col).iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn seed_has_every_topic() {
        let board = Board::seeded();
        assert_eq!(board.tasks(ColumnId::Basic).len(), 15);
        assert_eq!(board.tasks(ColumnId::Switching).len(), 15);
        assert_eq!(board.tasks(ColumnId::Routing).len(), 20);
        assert_eq!(board.tasks(ColumnId::Wlan).len(), 7);
        assert_eq!(board.tasks(ColumnId::Asa).len(), 8);
        assert_eq!(board.tasks(ColumnId::Routing)[9].title, "RIP, EIGRP, OSPF & BGP Routing");
    }

    #[test]
    fn added_tasks_go_to_the_front() {
        let mut board = Board::seeded();
        let task = board.add_task(ColumnId::Wlan, "  Lightweight APs ").unwrap();
        assert!(task.id.starts_with('t'));
        assert_eq!(task.title, "Lightweight APs");
        assert_eq!(board.tasks(ColumnId::Wlan)[0].id, task.id);

        let err = board.add_task(ColumnId::Wlan, "   ").unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn progress_rounds_and_handles_empty_columns() {
        let mut board = Board::empty();
        assert_eq!(board.column_progress(ColumnId::Asa).percent, 0);

        for title in ["one", "two", "three"] {
            board.add_task(ColumnId::Asa, title).unwrap();
        }
        let first = board.tasks(ColumnId::Asa)[0].id.clone();
        board.toggle_done(ColumnId::Asa, &first).unwrap();
        let progress = board.column_progress(ColumnId::Asa);
        assert_eq!((progress.done, progress.total, progress.percent), (1, 3, 33));

        board.bulk_set_done(ColumnId::Asa, true);
        assert_eq!(board.column_progress(ColumnId::Asa).percent, 100);
    }

    #[test]
    fn clear_completed_reports_removed() {
        let mut board = Board::seeded();
        board.toggle_done(ColumnId::Basic, "b1").unwrap();
        board.toggle_done(ColumnId::Basic, "b2").unwrap();
        assert_eq!(board.clear_completed(ColumnId::Basic), 2);
        assert_eq!(board.tasks(ColumnId::Basic).len(), 13);
        assert_eq!(board.clear_completed(ColumnId::Basic), 0);
    }

    #[test]
    fn move_between_and_within_columns() {
        let mut board = Board::seeded();
        board.move_task("s1", ColumnId::Asa, Some(1)).unwrap();
        assert_eq!(ids(&board, ColumnId::Asa)[1], "s1");
        assert!(!ids(&board, ColumnId::Switching).contains(&"s1".to_string()));

        board.move_task("a1", ColumnId::Asa, None).unwrap();
        assert_eq!(ids(&board, ColumnId::Asa).last().unwrap(), "a1");

        board.move_task("w7", ColumnId::Wlan, Some(0)).unwrap();
        assert_eq!(ids(&board, ColumnId::Wlan)[0], "w7");

        board.move_task("b3", ColumnId::Wlan, Some(500)).unwrap();
        assert_eq!(ids(&board, ColumnId::Wlan).last().unwrap(), "b3");

        let err = board.move_task("nope", ColumnId::Wlan, None).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn update_applies_only_given_fields() {
        let mut board = Board::seeded();
        let patch = TaskPatch {
            notes: Some("show vlan brief".into()),
            starred: Some(true),
            ..Default::default()
        };
        let task = board.update_task(ColumnId::Switching, "s1", patch).unwrap();
        assert_eq!(task.title, "VLANs");
        assert_eq!(task.notes, "show vlan brief");
        assert!(task.starred);
        assert!(!task.done);
    }

    #[test]
    fn search_covers_title_and_notes() {
        let mut board = Board::seeded();
        board
            .update_task(
                ColumnId::Basic,
                "b2",
                TaskPatch {
                    notes: Some("uses OSPF area 0".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let hits = board.search("ospf");
        assert_eq!(hits[&ColumnId::Routing].len(), 2);
        assert_eq!(hits[&ColumnId::Basic][0].id, "b2");
        assert!(hits[&ColumnId::Wlan].is_empty());
    }

    #[test]
    fn csv_export_quotes_text_fields() {
        let mut board = Board::empty();
        board.add_task(ColumnId::Routing, "NAT \"overload\", PAT").unwrap();
        let csv = board.to_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("column,title,notes,done"));
        assert_eq!(
            lines.next(),
            Some("Routing Technologies,\"NAT \"\"overload\"\", PAT\",\"\",0")
        );
    }

    #[test]
    fn csv_import_reads_quoted_rows_and_falls_back_to_first_column() {
        let csv = "column,title,notes,done\n\
                   Routing Technologies,\"NAT, PAT\",\"say \"\"hi\"\"\",1\n\
                   \n\
                   Unknown,\"Orphan\",\"\",0\n\
                   broken,row\n";
        let board = Board::from_csv(csv).unwrap();
        let routing = board.tasks(ColumnId::Routing);
        assert_eq!(routing.len(), 1);
        assert_eq!(routing[0].title, "NAT, PAT");
        assert_eq!(routing[0].notes, "say \"hi\"");
        assert!(routing[0].done);
        assert_eq!(board.tasks(ColumnId::Basic)[0].title, "Orphan");
        assert!(board.tasks(ColumnId::Asa).is_empty());

        assert!(Board::from_csv("column,title,notes,done\n").is_err());
    }

    #[test]
    fn json_import_requires_data_and_fills_columns() {
        let board = Board::from_json(
            r#"{"data":{"asa":[{"id":"a1","title":"Basic Firewall Configs","notes":"","done":true}]}}"#,
        )
        .unwrap();
        assert!(board.tasks(ColumnId::Asa)[0].done);
        assert!(board.data.contains_key(&ColumnId::Basic));
        assert_eq!(board.columns.len(), 5);

        let err = Board::from_json(r#"{"columns":[]}"#).unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON file");
    }

    #[test]
    fn json_import_ignores_unknown_columns_and_fills_ids() {
        let board = Board::from_json(
            r#"{"data":{
                "ccnp":[{"id":"x9","title":"BGP communities"}],
                "routing":[{"title":"No id yet"},"junk",{"id":"r1","title":"Static Routing"}],
                "wlan":"not a list"
            }}"#,
        )
        .unwrap();
        assert_eq!(board.data.len(), 5);
        let routing = board.tasks(ColumnId::Routing);
        assert_eq!(routing.len(), 2);
        assert!(routing[0].id.starts_with('t'));
        assert_eq!(routing[0].title, "No id yet");
        assert_eq!(routing[1].id, "r1");
        assert!(board.tasks(ColumnId::Wlan).is_empty());
        assert!(board.find_column("x9").is_none());
    }
}
