use tabular_normalizer::ingestion::normalize;
use tabular_normalizer::types::{LineTerminator, RawFile, TableSource};
use tabular_normalizer::FailureKind;

fn csv(name: &str, body: &[u8]) -> RawFile {
    RawFile::new(name, body.to_vec())
}

#[test]
fn simple_comma_table_is_recovered_as_is() {
    let table = normalize(&csv("simple.csv", b"a,b,c\n1,2,3\n4,5,6\n7,8,9\n")).unwrap();

    assert_eq!(table.header(), ["a", "b", "c"]);
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.rows()[2], ["7", "8", "9"]);
    assert_eq!(table.dialect().unwrap().delimiter, b',');
    assert!(!table.quality().is_degraded());
}

#[test]
fn metadata_preamble_is_skipped() {
    let body = "Relevé d'opérations;Compte 0042\n\
                Période;01/2024\n\
                \n\
                Date;Libellé;Montant;Devise\n\
                02/01/2024;Loyer;-850,00;EUR\n\
                03/01/2024;Salaire;2100,00;EUR\n\
                05/01/2024;Courses;-64,30;EUR\n\
                08/01/2024;Électricité;-48,12;EUR\n\
                09/01/2024;Remboursement;15,00;EUR\n";
    let table = normalize(&csv("releve.csv", body.as_bytes())).unwrap();

    assert_eq!(table.header(), ["Date", "Libellé", "Montant", "Devise"]);
    assert_eq!(table.row_count(), 5);
    assert_eq!(table.rows()[3][1], "Électricité");
    match table.source() {
        TableSource::Csv { preamble_lines, encoding, .. } => {
            assert_eq!(*preamble_lines, 2);
            assert_eq!(encoding.name(), "UTF-8");
        }
        other => panic!("unexpected source: {other:?}"),
    }
}

#[test]
fn semicolon_wins_an_exact_tie_with_comma() {
    let table = normalize(&csv("tie.csv", b"a;b,c\n1;2,3\n4;5,6\n")).unwrap();

    assert_eq!(table.dialect().unwrap().delimiter, b';');
    assert_eq!(table.header(), ["a", "b,c"]);
    assert_eq!(table.rows()[1], ["4", "5,6"]);
}

#[test]
fn latin1_export_is_decoded_as_windows_1252() {
    let body = b"Nom;Pr\xe9nom;Ville\nDupont;Andr\xe9;Orl\xe9ans\nMartin;Zo\xe9;S\xe8te\n";
    let table = normalize(&csv("latin1.csv", body)).unwrap();

    assert_eq!(table.encoding().unwrap().name(), "windows-1252");
    assert!(!table.quality().low_confidence_encoding);
    assert_eq!(table.header(), ["Nom", "Prénom", "Ville"]);
    assert_eq!(table.rows()[1], ["Martin", "Zoé", "Sète"]);
}

#[test]
fn mostly_utf8_with_stray_bytes_falls_back_and_is_flagged() {
    let mut body = String::from("nom;ville\n");
    for _ in 0..10 {
        body.push_str("José;Besançon\n");
    }
    let mut bytes = body.into_bytes();
    bytes.extend_from_slice(b"Ren\xff;Lyon\n");

    let table = normalize(&csv("mixed.csv", &bytes)).unwrap();

    assert!(table.quality().low_confidence_encoding);
    assert!(table.quality().decode_error.is_some());
    assert!(table.quality().is_degraded());
    assert_eq!(table.encoding().unwrap().name(), "windows-1252");
    assert_eq!(table.row_count(), 11);
}

#[test]
fn short_and_long_rows_are_flagged() {
    let body = b"a;b;c\n1;2;3\n4;5;6\n7;8\n9;10;11;12\n13;14;15\n";
    let table = normalize(&csv("ragged.csv", body)).unwrap();

    assert_eq!(table.row_count(), 5);
    assert_eq!(table.rows()[2], ["7", "8", ""]);
    assert_eq!(table.rows()[3], ["9", "10", "11"]);
    let q = table.quality();
    assert!(q.row_length_mismatch);
    assert_eq!(q.padded_rows, 1);
    assert_eq!(q.truncated_rows, 1);
    assert!(table.is_consistent());
}

#[test]
fn trailing_delimiters_do_not_widen_the_table() {
    let table = normalize(&csv("trailing.csv", b"a;b;\n1;2;\n3;4;\n")).unwrap();

    assert_eq!(table.header(), ["a", "b"]);
    assert_eq!(table.row_count(), 2);
    assert!(!table.quality().row_length_mismatch);
}

#[test]
fn optional_last_column_keeps_the_real_header() {
    let table = normalize(&csv("notes.csv", b"id;name;note\n1;Ada;\n2;Bob;\n3;Cy;\n4;Di;vip\n")).unwrap();

    assert_eq!(table.header(), ["id", "name", "note"]);
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.rows()[0], ["1", "Ada", ""]);
    assert_eq!(table.rows()[3], ["4", "Di", "vip"]);
    assert!(!table.quality().is_degraded());

    let table = normalize(&csv("notes.csv", b"id;name;note\n1;Ada;\n2;Bob;x\n3;Cy;\n4;Di;vip\n")).unwrap();
    assert_eq!(table.header(), ["id", "name", "note"]);
    assert!(!table.quality().no_header_detected);
    assert_eq!(table.rows()[1], ["2", "Bob", "x"]);
}

#[test]
fn wider_block_after_the_table_stays_data() {
    let body = b"a;b\n1;2\n3;4\n5;6\nTotal;x;y;z\nTotal;x;y;z\nTotal;x;y;z\n";
    let table = normalize(&csv("footer.csv", body)).unwrap();

    assert_eq!(table.header(), ["a", "b"]);
    assert_eq!(table.row_count(), 6);
    assert_eq!(table.rows()[0], ["1", "2"]);
    assert_eq!(table.rows()[3], ["Total", "x"]);
    assert!(table.quality().row_length_mismatch);
    assert_eq!(table.quality().truncated_rows, 3);
    match table.source() {
        TableSource::Csv { preamble_lines, .. } => assert_eq!(*preamble_lines, 0),
        other => panic!("unexpected source: {other:?}"),
    }
}

#[test]
fn bank_remittance_export_skips_its_metadata_blocks() {
    let text = "DATE DE L\u{b4}EXPORT :;06/05/2025 14:42:10\r\n\
                ECRAN :;LISTE DES OPERATIONS D\u{b4}UNE REMISE;\r\n\
                REF : FR59ZZZ86395E-412556;LIBELLE : PRINC. *5264*\r\n\
                COMPTE : FR76 3000 4008 2800 0132 9526 476;TYPE : Pr\u{e9}l\u{e8}vement standard\r\n\
                STATUT : A valider\r\n\
                \r\n\
                Ech\u{e9}ance le :;07/05/2025\r\n\
                Montant total :;285,30 EUR\r\n\
                Nombre de pr\u{e9}l\u{e8}vement(s) :;2\r\n\
                \r\n\
                Liste des op\u{e9}rations\r\n\
                D\u{e9}biteur;R\u{e9}f\u{e9}rence;Compte ;Montant;Devise;Statut\r\n\
                Viet To Wok;0022-83858785500019-ABO-0525-15719;FR76 3000 3014 5000 0270 3328 526;27;EUR;Accept\u{e9};\r\n\
                Bijouterie L'Or en Scene Centre-Ville;0022-39828770600038-ABO-0525-15722;FR76 3000 4003 3600 0101 1190 332;15,3;EUR;Accept\u{e9};\r\n";
    let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(text);
    assert!(!unmappable);

    let table = normalize(&csv("LISTE_OPERATIONS_20250506_1442.csv", &bytes)).unwrap();

    assert_eq!(
        table.header(),
        ["Débiteur", "Référence", "Compte", "Montant", "Devise", "Statut"]
    );
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.rows()[1][0], "Bijouterie L'Or en Scene Centre-Ville");
    assert_eq!(table.rows()[1][5], "Accepté");
    assert!(!table.quality().is_degraded());
    match table.source() {
        TableSource::Csv { encoding, dialect, preamble_lines } => {
            assert_eq!(encoding.name(), "windows-1252");
            assert_eq!(dialect.delimiter, b';');
            assert_eq!(dialect.terminator, LineTerminator::CrLf);
            assert_eq!(*preamble_lines, 9);
        }
        other => panic!("unexpected source: {other:?}"),
    }
}

#[test]
fn single_quoted_fields_keep_their_commas() {
    let table = normalize(&csv("quoted.csv", b"'a,b'|'c'\n'd,e'|'f'\n'g'|'h,i'\n")).unwrap();

    assert_eq!(table.dialect().unwrap().delimiter, b'|');
    assert_eq!(table.header(), ["a,b", "c"]);
    assert_eq!(table.rows()[1], ["g", "h,i"]);
}

#[test]
fn quoted_delimiters_stay_inside_their_field() {
    let table = normalize(&csv("quoted.csv", b"id;comment\n1;\"a;b\"\n2;\"c\"\n3;d\n")).unwrap();

    assert_eq!(table.rows()[0], ["1", "a;b"]);
    assert_eq!(table.rows()[1], ["2", "c"]);
}

#[test]
fn utf8_bom_is_stripped_from_the_header() {
    let table = normalize(&csv("bom.csv", "\u{FEFF}id;name\n1;Zoé\n2;Léa\n".as_bytes())).unwrap();

    assert_eq!(table.header(), ["id", "name"]);
    assert_eq!(table.encoding().unwrap().name(), "UTF-8");
    assert!((table.encoding().unwrap().confidence - 1.0).abs() < f32::EPSILON);
}

#[test]
fn crlf_terminators_are_detected() {
    let table = normalize(&csv("crlf.csv", b"a;b\r\n1;2\r\n3;4\r\n")).unwrap();

    assert_eq!(table.dialect().unwrap().terminator, LineTerminator::CrLf);
    assert_eq!(table.rows()[1], ["3", "4"]);
}

#[test]
fn unstable_field_counts_become_a_headerless_table() {
    let table = normalize(&csv("noheader.csv", b"1;2\n3;4;5\n6;7\n8;9;10\n")).unwrap();

    assert!(table.quality().no_header_detected);
    assert_eq!(table.header(), ["column_1", "column_2"]);
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.rows()[0], ["1", "2"]);
}

#[test]
fn single_line_file_is_a_header_without_rows() {
    let table = normalize(&csv("one.csv", b"a|b|c\n")).unwrap();

    assert_eq!(table.header(), ["a", "b", "c"]);
    assert_eq!(table.row_count(), 0);
}

#[test]
fn empty_and_blank_files_fail_as_empty() {
    for body in [&b""[..], b"\n\n", b"  \r\n ;; \n"] {
        let err = normalize(&csv("empty.csv", body)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::EmptyFile, "body {body:?}");
    }
}

#[test]
fn text_without_any_delimiter_is_unsniffable() {
    let err = normalize(&csv("prose.csv", b"hello world\nthis is not\na table at all\n")).unwrap_err();

    assert_eq!(err.kind(), FailureKind::UnsniffableDialect);
    assert!(err.message().is_some());
    assert!(err.to_string().starts_with("prose.csv: "));
}

#[test]
fn normalization_is_deterministic() {
    let raw = csv("again.csv", b"Export\nid;v\n1;a\n2;b\n3;c\n");
    let first = normalize(&raw).unwrap();
    let second = normalize(&raw).unwrap();

    assert_eq!(first, second);
}
