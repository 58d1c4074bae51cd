// src/main.rs

use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::error::Error;

// Response types
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    usuario: Usuario,
}

#[derive(Debug, Deserialize)]
struct Usuario {
    id: i64,
    email: String,
    nombre: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    insertados: usize,
}

#[derive(Debug, Deserialize)]
struct Registro {
    id: i64,
    dependencia: String,
    identificacion: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    registros: Vec<Registro>,
}

#[derive(Debug, Deserialize)]
struct UnitCount {
    dependencia: String,
    total: i64,
}

#[derive(Debug, Deserialize)]
struct ByUnitResponse {
    dependencias: Vec<UnitCount>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url =
        std::env::var("NOVEDADES_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let email = std::env::var("NOVEDADES_EMAIL").unwrap_or_else(|_| "ana@unidad.gov.co".to_string());
    let password = std::env::var("NOVEDADES_PASSWORD").unwrap_or_else(|_| "secreta123".to_string());
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health_response = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;
    println!("Health check response: {:?}", health_response);

    // Test 2: Login
    println!("\n🔍 Logging in as {}...", email);
    let login_response = client
        .post(format!("{}/api/login", base_url))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;

    if !login_response.status().is_success() {
        println!("Login failed: {}", login_response.text().await?);
        println!("Seed a user first: novedades-core import-users --file users.csv");
        return Ok(());
    }
    let login = login_response.json::<LoginResponse>().await?;
    println!("Logged in as {} (id {})", login.usuario.nombre, login.usuario.id);

    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", login.token))?,
    );

    // Test 3: Submit a batch of records
    println!("\n🔍 Submitting a batch of records...");
    let suffix = std::process::id();
    let batch = json!({
        "usuario": login.usuario.email,
        "registros": [
            {
                "dependencia": "Comando Alfa",
                "identificacion": format!("cc-{}-1", suffix),
                "grado": "SG",
                "nombre": "Prueba Uno",
                "novedad": "Permiso",
                "detalle": "Permiso de 24 horas"
            },
            {
                "dependencia": "Comando Bravo",
                "identificacion": format!("cc-{}-2", suffix),
                "grado": "CT",
                "nombre": "Prueba Dos",
                "novedad": "Comisión"
            }
        ]
    });
    let submit_response = client
        .post(format!("{}/api/records", base_url))
        .headers(headers.clone())
        .json(&batch)
        .send()
        .await?;
    println!("Submit status: {}", submit_response.status());
    if submit_response.status().is_success() {
        let submitted = submit_response.json::<SubmitResponse>().await?;
        println!("Inserted {} records", submitted.insertados);
    } else {
        println!("Submit body: {}", submit_response.text().await?);
    }

    // Test 4: Resubmitting the same batch must yield a 409 conflict
    println!("\n🔍 Resubmitting the same batch (expecting 409)...");
    let conflict_response = client
        .post(format!("{}/api/records", base_url))
        .headers(headers.clone())
        .json(&batch)
        .send()
        .await?;
    if conflict_response.status() == StatusCode::CONFLICT {
        println!("Got the expected conflict: {}", conflict_response.text().await?);
    } else {
        println!(
            "Unexpected status {} for duplicate batch",
            conflict_response.status()
        );
    }

    // Test 5: List own records
    println!("\n🔍 Listing records...");
    let list = client
        .get(format!("{}/api/records", base_url))
        .query(&[("usuario", login.usuario.email.as_str())])
        .headers(headers.clone())
        .send()
        .await?
        .json::<ListResponse>()
        .await?;
    println!("Records on file: {}", list.registros.len());
    for registro in list.registros.iter().take(5) {
        println!(
            " - #{} {} ({})",
            registro.id, registro.identificacion, registro.dependencia
        );
    }

    // Test 6: Aggregate by unit
    println!("\n🔍 Aggregating by unit...");
    let by_unit = client
        .get(format!("{}/api/records/by-unit", base_url))
        .headers(headers.clone())
        .send()
        .await?
        .json::<ByUnitResponse>()
        .await?;
    for unit in &by_unit.dependencias {
        println!(" - {}: {}", unit.dependencia, unit.total);
    }

    // Test 7: Download the PDF report
    println!("\n🔍 Downloading the PDF report...");
    let pdf_response = client
        .get(format!("{}/api/records/pdf", base_url))
        .query(&[("usuario", login.usuario.email.as_str())])
        .headers(headers.clone())
        .send()
        .await?;
    println!("PDF status: {}", pdf_response.status());
    if pdf_response.status().is_success() {
        let bytes = pdf_response.bytes().await?;
        let path = "registro-novedades.pdf";
        std::fs::write(path, &bytes)?;
        println!("Saved {} bytes to {}", bytes.len(), path);
    }

    // Test 8: Delete the first record
    if let Some(first) = list.registros.first() {
        println!("\n🔍 Deleting record #{}...", first.id);
        let delete_response = client
            .delete(format!("{}/api/records/{}", base_url, first.id))
            .query(&[("usuario", login.usuario.email.as_str())])
            .headers(headers)
            .send()
            .await?;
        println!("Delete status: {}", delete_response.status());
    }

    println!("\n✅ Testing complete!");

    Ok(())
}
