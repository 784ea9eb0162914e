//! Table export as CSV.
//!
//! Columns are `id`, `createdTime`, then every field name across the records
//! in sorted order. Text is written as-is, missing and null values as empty
//! cells, and anything else (numbers, booleans, arrays, objects) as compact JSON
//! so attachments and linked records survive the export.

use serde_json::Value;

use super::response::RecordList;

/// Encode records as CSV with a header row.
pub fn records_to_csv(records: &RecordList) -> Result<Vec<u8>, csv::Error> {
    let names = records.field_names();
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(["id", "createdTime"].into_iter().chain(names.iter().map(String::as_str)))?;
    for record in &records.0 {
        let mut row = vec![record.id.clone(), record.created_time.clone().unwrap_or_default()];
        row.extend(names.iter().map(|name| record.fields.get(name).map(cell).unwrap_or_default()));
        writer.write_record(&row)?;
    }

    writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_csv_columns_and_quoting() {
        let records: RecordList = serde_json::from_value(json!([
            {"id": "recAAAAAAAAAAAAAA", "createdTime": "2024-03-01T09:30:00.000Z",
             "fields": {"Name": "Write, then \"ship\"", "Tags": ["a", "b"], "Estimate": 3}},
            {"id": "recBBBBBBBBBBBBBB", "fields": {"Name": "Review\nand merge", "Done": true}}
        ]))
        .unwrap();

        let text = String::from_utf8(records_to_csv(&records).unwrap()).unwrap();
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, ["id", "createdTime", "Done", "Estimate", "Name", "Tags"]);

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][4], "Write, then \"ship\"");
        assert_eq!(&rows[0][5], r#"["a","b"]"#);
        assert_eq!(&rows[0][3], "3");
        assert_eq!(&rows[1][1], "");
        assert_eq!(&rows[1][2], "true");
        assert_eq!(&rows[1][4], "Review\nand merge");
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let text = String::from_utf8(records_to_csv(&RecordList::default()).unwrap()).unwrap();
        assert_eq!(text, "id,createdTime\n");
    }
}
