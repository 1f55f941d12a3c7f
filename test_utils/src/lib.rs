use std::collections::HashMap;

use serde::Serialize;

pub const PAYMENT_HEADER: &str =
    "Sr.no,Pay Date,Lobby,SFA id,name,cms id,receiver,amount,payment mode,remarks";

#[derive(Serialize)]
struct PaymentRow<'a> {
    #[serde(rename = "Sr.no")]
    sr_no: &'a str,
    #[serde(rename = "Pay Date")]
    pay_date: &'a str,
    #[serde(rename = "Lobby")]
    lobby: &'a str,
    #[serde(rename = "SFA id")]
    sfa_id: &'a str,
    name: &'a str,
    #[serde(rename = "cms id")]
    cms_id: &'a str,
    receiver: &'a str,
    amount: &'a str,
    #[serde(rename = "payment mode")]
    payment_mode: &'a str,
    remarks: &'a str,
}

impl<'a> PaymentRow<'a> {
    fn from_fields(r: &'a [String; 10]) -> Self {
        Self {
            sr_no: &r[0],
            pay_date: &r[1],
            lobby: &r[2],
            sfa_id: &r[3],
            name: &r[4],
            cms_id: &r[5],
            receiver: &r[6],
            amount: &r[7],
            payment_mode: &r[8],
            remarks: &r[9],
        }
    }
}

// Only used during testing so no need to return result
pub fn create_payments_csv(rows: Vec<[&str; 10]>) -> String {
    let owned: Vec<[String; 10]> = rows
        .into_iter()
        .map(|r| r.map(|field| field.to_string()))
        .collect();
    write_payments(&owned)
}

fn write_payments(rows: &[[String; 10]]) -> String {
    let mut wtr = csv::Writer::from_writer(vec![]);
    if rows.is_empty() {
        wtr.write_record(PAYMENT_HEADER.split(',')).unwrap();
    }
    for r in rows {
        wtr.serialize(PaymentRow::from_fields(r)).unwrap();
    }
    wtr.flush().unwrap();
    String::from_utf8(wtr.into_inner().unwrap()).unwrap()
}

/// `count` payments dated `pay_date`, each paid by a distinct `SFA{n}`, with
/// lobbies taken round robin from `lobbies`.
pub fn generate_payments_csv(count: usize, pay_date: &str, lobbies: &[&str]) -> String {
    let rows: Vec<[String; 10]> = (1..=count)
        .map(|n| {
            [
                n.to_string(),
                pay_date.to_string(),
                lobbies[(n - 1) % lobbies.len()].to_string(),
                format!("SFA{}", n),
                format!("Member {}", n),
                format!("CMS{}", n),
                "Collector".to_string(),
                "₹1,000.00".to_string(),
                "UPI".to_string(),
                String::new(),
            ]
        })
        .collect();
    write_payments(&rows)
}

fn split_to_dict(csv: &str, key_column: usize) -> HashMap<String, Vec<String>> {
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    reader
        .records()
        .map(|r| {
            let fields: Vec<String> = r.unwrap().iter().map(str::to_string).collect();
            (fields[key_column].clone(), fields)
        })
        .collect()
}

// Row order of a report is store order, which tests should not depend on
pub fn assert_unsorted_eq(s1: &str, s2: &str, key_column: usize) {
    let sut1 = split_to_dict(s1, key_column);
    let sut2 = split_to_dict(s2, key_column);
    if sut1.len() != sut2.len() {
        panic!("csvs do not contain the same number of rows");
    }

    sut1.iter().for_each(|(k, v)| match sut2.get(k) {
        Some(row) => assert_eq!(row, v),
        None => panic!("row {} not found in both csvs", k),
    })
}

#[cfg(test)]
mod tests {
    use crate::{assert_unsorted_eq, create_payments_csv, generate_payments_csv, split_to_dict};

    #[test]
    fn create_payments_csv_writes_import_headers() {
        let sut = create_payments_csv(vec![[
            "1", "14-Sep-2025", "DLI", "SFA1", "Asha", "CMS1", "Ravi", "100", "UPI", "",
        ]]);
        let expected = "Sr.no,Pay Date,Lobby,SFA id,name,cms id,receiver,amount,payment mode,remarks\n\
                        1,14-Sep-2025,DLI,SFA1,Asha,CMS1,Ravi,100,UPI,\n";
        assert_eq!(sut, expected);
    }

    #[test]
    fn empty_payments_csv_is_just_the_header() {
        let sut = create_payments_csv(vec![]);
        assert_eq!(sut.lines().count(), 1);
    }

    #[test]
    fn generated_rows_quote_currency_amounts() {
        let sut = generate_payments_csv(3, "01-Jan-2025", &["DLI", "ROK"]);
        let lines: Vec<&str> = sut.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "3,01-Jan-2025,DLI,SFA3,Member 3,CMS3,Collector,\"₹1,000.00\",UPI,");
    }

    #[test]
    fn csvs_are_split_into_dicts() {
        let csv = "a,b\n\"1\",\"x, y\"\n2,z\n";
        let sut = split_to_dict(csv, 0);
        assert_eq!(sut["1"], vec!["1", "x, y"]);
        assert_eq!(sut["2"], vec!["2", "z"]);
    }

    #[test]
    fn two_unsorted_csvs_will_assert_eq() {
        let csv1 = "k,v\n1,a\n2,b\n3,c\n";
        let csv2 = "k,v\n3,c\n1,a\n2,b\n";
        assert_unsorted_eq(csv1, csv2, 0);
    }

    #[test]
    #[should_panic]
    fn two_unequal_len_csvs_will_assert_false() {
        let csv1 = "k,v\n1,a\n2,b\n";
        let csv2 = "k,v\n1,a\n2,b\n3,c\n";
        assert_unsorted_eq(csv1, csv2, 0);
    }

    #[test]
    #[should_panic]
    fn two_unequal_csvs_will_assert_false() {
        let csv1 = "k,v\n1,a\n2,x\n";
        let csv2 = "k,v\n1,a\n2,b\n";
        assert_unsorted_eq(csv1, csv2, 0);
    }
}
