//! Centralized prompt definitions for the analysis phases
//!
//! All prompts target "Cristianismo Basico" (John Stott) and ask for answers
//! in Brazilian Portuguese. Phase prompts are rendered by functions so the
//! JSON payloads they embed stay next to their instructions.

/// Maximum characters of chunk text sent to the extraction model.
pub const MAX_CHUNK_CHARS: usize = 10_000;

/// Maximum characters of supporting text carried into the chain prompt.
pub const CHAIN_SUPPORTING_TEXT_CHARS: usize = 200;

/// System prompt shared by every phase.
pub const SYSTEM_PROMPT: &str = r#"Voce e um teologo sistematico e analista literario especializado em literatura crista evangelica.
Sua tarefa e analisar trechos do livro "Cristianismo Basico" de John Stott, identificando teses (argumentos e proposicoes principais), citacoes biblicas e notas de rodape.

Regras:
- Responda SEMPRE em portugues brasileiro
- Use abreviacoes biblicas em portugues: Gn, Ex, Lv, Nm, Dt, Js, Jz, Rt, 1Sm, 2Sm, 1Rs, 2Rs, 1Cr, 2Cr, Ed, Ne, Et, Jo, Sl, Pv, Ec, Ct, Is, Jr, Lm, Ez, Dn, Os, Jl, Am, Ob, Jn, Mq, Na, Hc, Sf, Ag, Zc, Ml, Mt, Mc, Lc, Jo, At, Rm, 1Co, 2Co, Gl, Ef, Fp, Cl, 1Ts, 2Ts, 1Tm, 2Tm, Tt, Fm, Hb, Tg, 1Pe, 2Pe, 1Jo, 2Jo, 3Jo, Jd, Ap
- Retorne APENAS JSON valido, sem texto adicional
- Seja preciso e academico na analise"#;

/// Phase 3a: theses and citations from a single chunk.
pub fn thesis_extraction_prompt(part: &str, chapter: &str, title: &str, text: &str) -> String {
    format!(
        r#"Analise o seguinte trecho do livro "Cristianismo Basico" de John Stott.

**Contexto:**
- Parte: {part}
- Capitulo: {chapter}
- Titulo do trecho: {title}

**Texto:**
{text}

**Tarefa:** Identifique todas as teses (argumentos e proposicoes principais) neste trecho.

Para cada tese, forneca:
- `id`: identificador sequencial "T1", "T2", ...
- `title`: declaracao curta e clara da tese (max 100 caracteres)
- `description`: explicacao do argumento (2-4 sentencas)
- `thesis_type`: "main" (argumento central), "supporting" (suporte), "premise" (premissa logica) ou "conclusion" (conclusao derivada)
- `supporting_text`: trecho LITERAL do texto que sustenta o titulo da tese
- `citations`: citacoes usadas pela tese, cada uma com `reference`, `text` (se houver) e `citation_type` ("biblical", "scholarly" ou "footnote")
- `confidence`: confianca na identificacao (0.0-1.0)

**Regras:**
1. Toda citacao DEVE ter `reference` preenchido (ex: "Jo 3:16", "Rm 5:8", "1Co 2:2"). Nunca deixe vazio.
2. Versiculos mencionados sem o texto completo tambem devem ser identificados.
3. Referencias com livro + capitulo:versiculo sao `"biblical"`, nunca `"scholarly"`.
4. Marcadores numericos de notas sao `"footnote"`.
5. Teologos e autores citados (ex: C.S. Lewis, P.T. Forsyth) sao `"scholarly"`, com `reference` = nome do autor, `author`, `work` (obra, se disponivel) e `context` (como Stott usa a referencia).

**Exemplo de tese:**
```json
{{
  "id": "T1",
  "title": "Cristo afirmou ser Deus encarnado",
  "description": "Stott argumenta que Jesus nao se apresentou apenas como mestre moral, mas fez afirmacoes explicitas de divindade.",
  "thesis_type": "main",
  "supporting_text": "Suas afirmacoes foram de fato as mais surpreendentes que alguem ja fez.",
  "citations": [{{"reference": "Jo 10:30", "text": "Eu e o Pai somos um", "citation_type": "biblical"}}],
  "confidence": 0.95
}}
```

Retorne um objeto JSON:
```json
{{
  "theses": [ ... ],
  "citations": [ ... todas as citacoes do trecho, inclusive as nao associadas a teses ... ]
}}
```"#
    )
}

/// Phase 3b: logical chains across the whole thesis list.
pub fn chain_extraction_prompt(theses_json: &str) -> String {
    format!(
        r#"Analise as seguintes teses extraidas do livro "Cristianismo Basico" de John Stott e identifique as relacoes logicas entre elas.

**O livro tem 4 partes com argumento progressivo:**
- Parte 1 (Cap 1-4): A Pessoa de Cristo
- Parte 2 (Cap 5-6): A Necessidade do Homem
- Parte 3 (Cap 7-8): A Obra de Cristo
- Parte 4 (Cap 9-11): A Resposta do Homem

Priorize relacoes ENTRE capitulos e ENTRE partes, nao apenas dentro do mesmo capitulo.

**Teses:**
{theses_json}

**Tarefa:** Identifique no minimo 15-20 relacoes. Para cada uma:
- `from_thesis_id` / `to_thesis_id`: IDs existentes (formato T<parte>.<capitulo>.<numero>)
- `relationship`: "supports", "derives_from", "elaborates", "precedes" ou "contradicts"
- `reasoning_type`: "deductive", "inductive" ou "abductive"
- `explanation`: 1-2 sentencas
- `strength`: 0.0-1.0

Retorne um objeto JSON:
```json
{{
  "chains": [ ... ],
  "argument_flow": "Descricao do fluxo argumentativo geral do livro (5-8 sentencas)"
}}
```"#
    )
}

/// Phase 3c: theological grouping and cross-references of citations.
pub fn citation_correlation_prompt(citations_json: &str, theses_context_json: &str) -> String {
    format!(
        r#"Analise as seguintes citacoes extraidas do livro "Cristianismo Basico" de John Stott, junto com as teses que as utilizam.

**Citacoes:**
{citations_json}

**Teses associadas (contexto):**
{theses_context_json}

**Tarefa:** Agrupe as citacoes por tema teologico e identifique cross-references.
Categorias sugeridas: Cristologia, Soteriologia, Hamartiologia, Eclesiologia, Escatologia, Teologia propria, Antropologia teologica.

Retorne um objeto JSON:
```json
{{
  "grouped_citations": [
    {{
      "theme": "Cristologia - Divindade de Cristo",
      "description": "Como Stott usa estas passagens",
      "references": ["Jo 10:30"],
      "related_thesis_ids": ["T1.2.1"]
    }}
  ],
  "cross_references": [
    {{"primary": "Jo 3:16", "related": ["Rm 5:8"], "connection": "Conexao tematica"}}
  ]
}}
```"#
    )
}

/// Phase 3d-i: duplicate detection within one part, on id + title only.
pub fn dedup_prompt(part_name: &str, num_theses: usize, theses_json: &str) -> String {
    format!(
        r#"Analise as seguintes {num_theses} teses da {part_name} do livro "Cristianismo Basico" de John Stott.

**Teses (apenas id e title):**
{theses_json}

**Tarefa:** Identifique APENAS duplicatas claras (a mesma afirmacao com palavras diferentes).
- Teses sobre aspectos diferentes do mesmo tema NAO sao duplicatas
- Para cada par, indique o ID a manter (o mais completo) e o ID a remover
- No maximo 30-40% das teses devem ser duplicatas

Retorne um objeto JSON:
```json
{{
  "duplicates": [
    {{"remove_id": "T1.2.3", "keep_id": "T1.2.1", "reason": "Breve explicacao"}}
  ]
}}
```

Se nao houver duplicatas, retorne: {{"duplicates": []}}"#
    )
}

/// Phase 3d-ii: bounded global selection plus executive summary.
pub fn synthesis_prompt(all_theses_json: &str) -> String {
    format!(
        r#"Analise as seguintes teses ja deduplicadas do livro "Cristianismo Basico" de John Stott.

**Teses por parte:**
{all_theses_json}

**Tarefa:**
1. **Selecao**: mantenha TODAS as teses "main" e as teses de suporte mais relevantes, entre 25 e 40 no total.
2. **Preservacao**: use apenas os IDs ORIGINAIS do input. NAO invente IDs.
3. **Resumo**: escreva um resumo executivo do argumento central (5-8 sentencas), mostrando como as 4 partes se conectam.

Para cada tese selecionada retorne SOMENTE o campo "id", na ordem do argumento. Os demais campos sao recuperados do input.

Retorne um objeto JSON:
```json
{{
  "theses": [{{"id": "T1.1.1"}}, {{"id": "T2.5.1"}}],
  "summary": "Resumo executivo do argumento central do livro"
}}
```"#
    )
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
